//! Configuration management.
//!
//! Settings come from an optional TOML file, then environment variables
//! override individual fields.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const API_KEY_VAR: &str = "APD_SENSORS_API_KEY";
pub const DEPLOYMENT_ID_VAR: &str = "APD_SENSORS_DEPLOYMENT_ID";
pub const LISTEN_VAR: &str = "APD_SENSORS_LISTEN";
pub const TEMPERATURE_DEVICE_VAR: &str = "APD_SENSORS_TEMPERATURE_DEVICE";
pub const DB_PATH_VAR: &str = "APD_SENSORS_DB_PATH";

/// Invalid or incomplete configuration, fatal at startup.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing config variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server listen address (e.g., "0.0.0.0:8000")
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Shared secret expected in the X-API-Key header
    #[serde(default)]
    pub api_key: Option<String>,

    /// Identifier reported by /deployment_id
    #[serde(default)]
    pub deployment_id: Option<String>,

    /// Climate probe configuration
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Historical storage configuration
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Climate probe configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// IIO device name (e.g. "iio:device0") or "auto" for auto-detection
    #[serde(default = "default_probe_device")]
    pub device: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            device: default_probe_device(),
        }
    }
}

/// Historical storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Whether to keep readings in the database
    #[serde(default)]
    pub enable: bool,

    /// SQLite database path
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Background collection interval in seconds (0 disables the loop)
    #[serde(default = "default_collect_interval")]
    pub collect_interval: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enable: false,
            database: default_database(),
            collect_interval: default_collect_interval(),
        }
    }
}

// Default value functions
fn default_listen() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_probe_device() -> String {
    "auto".to_string()
}

fn default_database() -> PathBuf {
    PathBuf::from("apd-sensors.sqlite")
}

fn default_collect_interval() -> u64 {
    60
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Overrides fields from environment variables.
    pub fn apply_env<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                API_KEY_VAR => self.api_key = Some(value),
                DEPLOYMENT_ID_VAR => self.deployment_id = Some(value),
                LISTEN_VAR => self.listen = value,
                TEMPERATURE_DEVICE_VAR => self.probe.device = value,
                DB_PATH_VAR => self.history.database = PathBuf::from(value),
                _ => {}
            }
        }
    }

    /// Returns the API key, which must be configured and non-blank.
    pub fn require_api_key(&self) -> std::result::Result<String, ConfigError> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing(vec![API_KEY_VAR]))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            api_key: None,
            deployment_id: None,
            probe: ProbeConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}
