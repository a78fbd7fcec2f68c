//! JPL fireball API client

use anyhow::{Context, Result};
use badaboom_common::Fireball;
use reqwest::Client;
use std::time::Duration;

use super::parser::parse_fireball_json;

pub const FIREBALL_API_URL: &str = "https://ssd-api.jpl.nasa.gov/fireball.api";
const REQUEST_TIMEOUT_SECONDS: u64 = 60;

/// Downloads the whole fireball catalogue in one request
pub struct FireballClient {
    client: Client,
    api_location: String,
}

impl FireballClient {
    pub fn new(api_location: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_location: api_location.unwrap_or_else(|| FIREBALL_API_URL.to_string()),
        })
    }

    pub async fn fetch_all(&self) -> Result<Vec<Fireball>> {
        tracing::info!("Fetching fireball data from {}", self.api_location);

        let response = self
            .client
            .get(&self.api_location)
            .send()
            .await
            .context("Failed to GET fireball data")?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "HTTP error {} for {}",
                response.status(),
                self.api_location
            ));
        }

        let json = response
            .text()
            .await
            .context("Failed to read fireball response body")?;

        let fireballs = parse_fireball_json(&json).context("Failed to parse fireball JSON")?;

        tracing::info!("Fetched {} fireballs", fireballs.len());
        Ok(fireballs)
    }
}
