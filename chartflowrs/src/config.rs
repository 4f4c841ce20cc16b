//! Configuration system for chartflow.
//!
//! TOML-based configuration with per-section defaults. Every knob has a
//! built-in default, so a missing or partial config file is never an error.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ChartflowError, Result};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ChartflowConfig {
    pub transform: TransformConfig,
    pub query: QueryConfig,
    pub role_cache: RoleCacheConfig,
}

/// Dataset transformation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Fraction of non-null values that must parse as datetimes for a
    /// column to be classified as datetime (default: 0.5).
    pub datetime_parse_threshold: f64,
    /// Parsed years below this are treated as misclassified datetimes
    /// and the raw value is kept (default: 1900).
    pub min_year: i32,
    /// Parsed years above this are treated as misclassified datetimes
    /// and the raw value is kept (default: 2100).
    pub max_year: i32,
}

/// Query generation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Row cap applied to every generated query (default: 2000).
    pub max_row_limit: u64,
}

/// Column-role cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoleCacheConfig {
    /// Cache TTL in seconds (default: 300).
    pub ttl_secs: u64,
    /// Maximum cached batch signatures (default: 256).
    pub max_size: usize,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            datetime_parse_threshold: 0.5,
            min_year: 1900,
            max_year: 2100,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { max_row_limit: 2000 }
    }
}

impl Default for RoleCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_size: 256,
        }
    }
}

impl ChartflowConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ChartflowError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| ChartflowError::Config(format!("failed to parse config: {e}")))
    }

    /// Load from default locations (env var, cwd, user config dir, or defaults).
    ///
    /// Search order:
    /// 1. `CHARTFLOW_CONFIG` environment variable
    /// 2. `./chartflow.toml` (current directory)
    /// 3. `~/.config/chartflow/config.toml` (user config dir)
    /// 4. Built-in defaults
    pub fn load_default() -> Self {
        if let Ok(path) = std::env::var("CHARTFLOW_CONFIG") {
            if let Ok(cfg) = Self::from_file(&path) {
                tracing::info!(path = %path, "loaded config from CHARTFLOW_CONFIG");
                return cfg;
            }
        }

        if let Ok(cfg) = Self::from_file("chartflow.toml") {
            tracing::info!("loaded config from ./chartflow.toml");
            return cfg;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("chartflow").join("config.toml");
            if let Ok(cfg) = Self::from_file(&user_config) {
                tracing::info!(path = %user_config.display(), "loaded config from user config dir");
                return cfg;
            }
        }

        tracing::debug!("no config file found, using defaults");
        Self::default()
    }
}
