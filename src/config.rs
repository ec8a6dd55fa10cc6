use serde::{Deserialize, Serialize};
use std::fs;
use thiserror::Error;

use crate::registry::status::LandStatus;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config yaml {path}: {reason}")]
    Parse { path: String, reason: String },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// Registry policy (allow-list, settable statuses, timestamp source)
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Where mutation timestamps come from.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimestampSource {
    /// Local UTC clock of the executing node
    #[default]
    WallClock,
    /// Timestamp assigned by the commit/ordering layer (replica-deterministic)
    Commit,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RegistryConfig {
    /// Organization identifiers permitted to run privileged operations
    #[serde(default = "default_authorized_orgs")]
    pub authorized_orgs: Vec<String>,
    /// Statuses UpdateLandStatus is allowed to set
    #[serde(default = "default_settable_statuses")]
    pub settable_statuses: Vec<LandStatus>,
    #[serde(default)]
    pub timestamp_source: TimestampSource,
}

fn default_authorized_orgs() -> Vec<String> {
    vec![
        "LandRegMSP".to_string(),
        "SubRegistrarMSP".to_string(),
        "CourtMSP".to_string(),
    ]
}

fn default_settable_statuses() -> Vec<LandStatus> {
    LandStatus::ALL.to_vec()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            authorized_orgs: default_authorized_orgs(),
            settable_statuses: default_settable_statuses(),
            timestamp_source: TimestampSource::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "./logs".to_string(),
            log_file: "land-registry.log".to_string(),
            use_json: false,
            rotation: "daily".to_string(),
            registry: RegistryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load `config/<env>.yaml`
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        Self::from_file(&format!("config/{}.yaml", env))
    }

    /// Load configuration from an explicit YAML path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(path, &content)
    }

    fn from_yaml(path: &str, content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}
