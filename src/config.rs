//! Deployment configuration.
//!
//! Every struct carries working defaults; a JSON file only needs the keys it
//! changes.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::executor::OverlapPolicy;
use crate::import::ImportLimits;
use crate::osrm::OsrmConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Profile names differ between deployments, so none are baked into the
/// routing logic.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub default_profile: String,
    pub default_algorithm: String,
    /// Tried in order after the active profile is rejected.
    pub fallback_profiles: Vec<String>,
    /// Probed when no status endpoint names a profile.
    pub probe_profiles: Vec<String>,
    pub poll_interval_secs: u64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            default_profile: "driving".to_string(),
            default_algorithm: "mld".to_string(),
            fallback_profiles: strings(&["van_scpa", "driving", "car", "van_2022"]),
            probe_profiles: strings(&["van_2022", "van_scpa", "driving", "car"]),
            poll_interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InspectorConfig {
    pub osrm: OsrmConfig,
    pub profiles: ProfileConfig,
    pub import: ImportLimits,
    pub requery_debounce_ms: u64,
    pub overlap: OverlapPolicy,
    pub max_url_length: usize,
    pub auto_requery: bool,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            osrm: OsrmConfig::default(),
            profiles: ProfileConfig::default(),
            import: ImportLimits::default(),
            requery_debounce_ms: 300,
            overlap: OverlapPolicy::Supersede,
            max_url_length: 2048,
            auto_requery: true,
        }
    }
}

impl InspectorConfig {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
