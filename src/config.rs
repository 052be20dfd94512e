//! Configuration loading and management.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

/// Server-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Port for the HTTP API.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Interval between scheduled sweep runs, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            port: default_port(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

/// Generation engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum length (in days) of a generation date range.
    /// Caps the cost of a single generator call; longer ranges are rejected.
    #[serde(default = "default_max_range_days")]
    pub max_range_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_range_days: default_max_range_days(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".opsboard/opsboard.db")
}

fn default_port() -> u16 {
    8343
}

fn default_sweep_interval() -> u64 {
    3600 // hourly
}

fn default_max_range_days() -> i64 {
    366
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from the default location or return defaults.
    /// Environment variables override file values.
    pub fn load_or_default() -> Self {
        let mut config = Self::load(".opsboard/config.yaml").unwrap_or_default();

        if let Ok(db_path) = std::env::var("OPSBOARD_DB_PATH") {
            config.server.db_path = PathBuf::from(db_path);
        }

        if let Ok(port) = std::env::var("OPSBOARD_PORT") {
            if let Ok(port) = port.parse() {
                config.server.port = port;
            }
        }

        if let Ok(interval) = std::env::var("OPSBOARD_SWEEP_INTERVAL") {
            if let Ok(interval) = interval.parse() {
                config.server.sweep_interval_seconds = interval;
            }
        }

        if let Ok(days) = std::env::var("OPSBOARD_MAX_RANGE_DAYS") {
            if let Ok(days) = days.parse() {
                config.engine.max_range_days = days;
            }
        }

        config
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
