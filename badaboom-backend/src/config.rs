use crate::module::neo::{DEFAULT_API_LOCATION, DEFAULT_ASTEROID_PATH, DEFAULT_NEO_FEED_PATH, ParserPaths};
use anyhow::Context;
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// NASA API key, see https://api.nasa.gov/
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_neo_api_location")]
    pub neo_api_location: String,

    #[serde(default = "default_fireball_api_location")]
    pub fireball_api_location: String,

    #[serde(default = "default_neo_feed_path")]
    pub neo_feed_path: PathBuf,

    #[serde(default = "default_asteroid_path")]
    pub asteroid_path: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_start_year")]
    pub start_year: i32,

    #[serde(default = "default_end_year")]
    pub end_year: i32,
}

fn default_neo_api_location() -> String {
    DEFAULT_API_LOCATION.to_string()
}

fn default_fireball_api_location() -> String {
    crate::module::fireball::FIREBALL_API_URL.to_string()
}

fn default_neo_feed_path() -> PathBuf {
    PathBuf::from(DEFAULT_NEO_FEED_PATH)
}

fn default_asteroid_path() -> PathBuf {
    PathBuf::from(DEFAULT_ASTEROID_PATH)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_start_year() -> i32 {
    1980
}

fn default_end_year() -> i32 {
    Utc::now().year()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            neo_api_location: default_neo_api_location(),
            fireball_api_location: default_fireball_api_location(),
            neo_feed_path: default_neo_feed_path(),
            asteroid_path: default_asteroid_path(),
            output_dir: default_output_dir(),
            log_dir: default_log_dir(),
            log_level: default_log_level(),
            start_year: default_start_year(),
            end_year: default_end_year(),
        }
    }
}

impl BackendConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file {:?}", path))?;
        let config: BackendConfig = toml::from_str(&content)
            .context(format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    }

    /// Defaults when the file does not exist, parse errors are still errors
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parser_paths(&self) -> ParserPaths {
        ParserPaths {
            neo_feed_path: self.neo_feed_path.clone(),
            asteroid_path: self.asteroid_path.clone(),
        }
    }
}
