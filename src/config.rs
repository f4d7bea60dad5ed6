use crate::error::{Result, ScraperError};
use serde::Deserialize;
use std::fs;

const API_KEY_ENV: &str = "NASA_API_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub feed: FeedConfig,
    pub output: OutputConfig,
    /// Feed access credential, taken from the environment rather than the
    /// config file so the key never lands in version control. Empty when the
    /// variable is unset; only the feed client requires it.
    #[serde(skip)]
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_start_date")]
    pub start_date: String,
    #[serde(default = "default_target_count")]
    pub target_count: usize,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_raw_json_path")]
    pub raw_json_path: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_base_url() -> String {
    "https://api.nasa.gov/neo/rest/v1/feed".to_string()
}

fn default_start_date() -> String {
    "2024-01-01".to_string()
}

fn default_target_count() -> usize {
    10_000
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_raw_json_path() -> String {
    "output/nasa_neo_data.json".to_string()
}

fn default_db_path() -> String {
    "output/nasa_neo.db".to_string()
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = "config.toml";
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            ScraperError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path, e
            ))
        })?;

        let mut config: Config = toml::from_str(&config_content)?;
        config.api_key = std::env::var(API_KEY_ENV).unwrap_or_default();
        Ok(config)
    }

    /// Credential for the feed endpoint; read-only commands never need it.
    pub fn require_api_key(&self) -> Result<&str> {
        if self.api_key.is_empty() {
            return Err(ScraperError::Config(format!(
                "{} environment variable not set",
                API_KEY_ENV
            )));
        }
        Ok(&self.api_key)
    }
}
