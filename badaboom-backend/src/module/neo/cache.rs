//! On-disk CSV store for the event and asteroid tables

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use super::types::{NeoTables, ParserPaths};

pub const EVENT_COLUMNS: [&str; 7] = [
    "date",
    "asteroid_id",
    "asteroid_reference_id",
    "is_potentially_hazardous",
    "is_estimation",
    "relative_velocity_kms",
    "miss_distance_km",
];

pub const ASTEROID_COLUMNS: [&str; 9] = [
    "asteroid_id",
    "reference_id",
    "name",
    "is_potentially_hazardous",
    "is_sentry_object",
    "absolute_magnitude",
    "info_url",
    "estimated_diameter_min_km",
    "estimated_diameter_max_km",
];

/// Loads and rewrites the two cache files
#[derive(Debug, Clone)]
pub struct NeoCache {
    events_path: PathBuf,
    asteroids_path: PathBuf,
}

impl NeoCache {
    pub fn new(paths: ParserPaths) -> Self {
        Self {
            events_path: paths.neo_feed_path,
            asteroids_path: paths.asteroid_path,
        }
    }

    pub fn events_path(&self) -> &Path {
        &self.events_path
    }

    pub fn asteroids_path(&self) -> &Path {
        &self.asteroids_path
    }

    /// Read both tables; a missing file yields an empty table
    pub async fn load(&self) -> Result<NeoTables> {
        let tables = NeoTables {
            events: load_table(&self.events_path).await?,
            asteroids: load_table(&self.asteroids_path).await?,
        };

        info!(
            "Loaded NEO cache: {} events from {:?}, {} asteroids from {:?}",
            tables.events.len(),
            self.events_path,
            tables.asteroids.len(),
            self.asteroids_path
        );
        Ok(tables)
    }

    /// Rewrite both files, each through a temporary file renamed into place
    pub async fn save(&self, tables: &NeoTables) -> Result<()> {
        let events = encode_table(&EVENT_COLUMNS, &tables.events)?;
        let asteroids = encode_table(&ASTEROID_COLUMNS, &tables.asteroids)?;

        replace_file(&self.events_path, &events).await?;
        replace_file(&self.asteroids_path, &asteroids).await?;

        debug!(
            "Saved NEO cache: {} events, {} asteroids",
            tables.events.len(),
            tables.asteroids.len()
        );
        Ok(())
    }
}

async fn load_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        debug!("Cache file does not exist: {:?}", path);
        return Ok(Vec::new());
    }

    let content = fs::read(path)
        .await
        .context(format!("Failed to read cache file {:?}", path))?;

    let mut reader = csv::Reader::from_reader(content.as_slice());
    let mut rows = Vec::new();
    for (index, row) in reader.deserialize().enumerate() {
        let row = row.context(format!("Failed to parse row {} of {:?}", index + 1, path))?;
        rows.push(row);
    }
    Ok(rows)
}

fn encode_table<T: Serialize>(columns: &[&str], rows: &[T]) -> Result<Vec<u8>> {
    // Header written by hand so that empty tables keep their schema
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer
        .write_record(columns)
        .context("Failed to write CSV header")?;
    for row in rows {
        writer.serialize(row).context("Failed to serialize CSV row")?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV buffer: {}", e))
}

async fn replace_file(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .context(format!("Failed to create cache directory {:?}", parent))?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, content)
        .await
        .context(format!("Failed to write {:?}", tmp_path))?;
    fs::rename(&tmp_path, path)
        .await
        .context(format!("Failed to move {:?} into place", tmp_path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use badaboom_common::{Asteroid, DiameterRange, NeoEvent};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn cache_in(dir: &TempDir) -> NeoCache {
        NeoCache::new(ParserPaths {
            neo_feed_path: dir.path().join("neo_feed_data.csv"),
            asteroid_path: dir.path().join("asteroid_data.csv"),
        })
    }

    fn sample_tables() -> NeoTables {
        NeoTables {
            events: vec![NeoEvent {
                date: NaiveDate::from_ymd_opt(2015, 9, 8).unwrap(),
                asteroid_id: 3542519,
                asteroid_reference_id: 3542519,
                is_potentially_hazardous: false,
                is_estimation: false,
                relative_velocity_kms: 6.25,
                miss_distance_km: 42452302.5,
            }],
            asteroids: vec![
                Asteroid {
                    asteroid_id: 3542519,
                    reference_id: 3542519,
                    name: "(2010 PK9)".to_string(),
                    is_potentially_hazardous: false,
                    is_sentry_object: false,
                    absolute_magnitude: None,
                    info_url: "https://ssd.jpl.nasa.gov/tools/sbdb_lookup.html#/?sstr=3542519"
                        .to_string(),
                    estimated_diameter: Some(DiameterRange {
                        min_km: 0.125,
                        max_km: 0.25,
                    }),
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_load_without_files_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let tables = cache_in(&temp_dir).load().await.unwrap();
        assert_eq!(tables, NeoTables::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let cache = cache_in(&temp_dir);

        cache.save(&sample_tables()).await.unwrap();
        let loaded = cache.load().await.unwrap();

        assert_eq!(loaded, sample_tables());
        assert!(!temp_dir.path().join("neo_feed_data.csv.tmp").exists());
    }

    #[tokio::test]
    async fn test_empty_tables_keep_headers() {
        let temp_dir = TempDir::new().unwrap();
        let cache = cache_in(&temp_dir);

        cache.save(&NeoTables::default()).await.unwrap();

        let events = std::fs::read_to_string(cache.events_path()).unwrap();
        assert_eq!(events.trim_end(), EVENT_COLUMNS.join(","));
        let asteroids = std::fs::read_to_string(cache.asteroids_path()).unwrap();
        assert_eq!(asteroids.trim_end(), ASTEROID_COLUMNS.join(","));
        assert_eq!(cache.load().await.unwrap(), NeoTables::default());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let cache = cache_in(&temp_dir);
        std::fs::write(
            cache.events_path(),
            format!("{}\nnot-a-date,1,1,false,false,1.0,2.0\n", EVENT_COLUMNS.join(",")),
        )
        .unwrap();

        assert!(cache.load().await.is_err());
    }
}
