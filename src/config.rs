//! Pipeline configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration for the Hargeisa district.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;
use crate::models::Bounds;

const DEFAULT_ENDPOINTS: &[&str] = &[
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub area: AreaConfig,
    pub retry: RetryConfig,
    pub labels: LabelConfig,
    pub search: SearchConfig,
    pub preload: PreloadConfig,
    pub focus: FocusConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Interchangeable Overpass interpreter URLs, tried in order
    pub endpoints: Vec<String>,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_ENDPOINTS.iter().map(|e| e.to_string()).collect(),
            timeout_secs: 60,
            user_agent: "Acacia/0.1 (street map; https://github.com/example)".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaConfig {
    /// Bounding box for the road dataset
    pub roads: Bounds,
    /// Bounding box for category (POI) queries
    pub places: Bounds,
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self {
            roads: Bounds::new(9.50, 43.99, 9.62, 44.13),
            places: Bounds::new(9.52, 44.02, 9.60, 44.11),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Full passes through the endpoint list for the road dataset
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub major_min_zoom: u8,
    pub secondary_min_zoom: u8,
    pub minor_min_zoom: u8,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            major_min_zoom: 12,
            secondary_min_zoom: 15,
            minor_min_zoom: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub max_places: usize,
    /// Road cap when place results are shown alongside
    pub max_roads: usize,
    /// Road cap when there are no place results
    pub max_roads_alone: usize,
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_places: 5,
            max_roads: 10,
            max_roads_alone: 15,
            debounce_ms: 200,
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreloadConfig {
    /// Delay between consecutive background category fetches
    pub stagger_ms: u64,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self { stagger_ms: 1500 }
    }
}

impl PreloadConfig {
    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    pub padding_px: u32,
    pub road_max_zoom: u8,
    pub place_zoom: u8,
    pub fly_duration_ms: u64,
    /// Wait after flying to a place before opening its popup
    pub popup_delay_ms: u64,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            padding_px: 50,
            road_max_zoom: 17,
            place_zoom: 18,
            fly_duration_ms: 800,
            popup_delay_ms: 850,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.endpoints.is_empty() {
            return Err(ConfigError::NoEndpoints);
        }
        for endpoint in &self.service.endpoints {
            Url::parse(endpoint).map_err(|source| ConfigError::InvalidEndpoint {
                endpoint: endpoint.clone(),
                source,
            })?;
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.service.endpoints.len(), 2);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [service]
            endpoints = ["https://overpass.example.org/api/interpreter"]

            [labels]
            secondary_min_zoom = 14
            "#
        )
        .unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(
            config.service.endpoints,
            vec!["https://overpass.example.org/api/interpreter".to_string()]
        );
        assert_eq!(config.labels.secondary_min_zoom, 14);
        assert_eq!(config.labels.minor_min_zoom, 16);
        assert_eq!(config.search.max_roads_alone, 15);
    }

    #[test]
    fn test_rejects_empty_endpoints() {
        let mut config = Config::default();
        config.service.endpoints.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoEndpoints)));
    }

    #[test]
    fn test_rejects_bad_url() {
        let mut config = Config::default();
        config.service.endpoints = vec!["not a url".to_string()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEndpoint { .. })
        ));
    }
}
