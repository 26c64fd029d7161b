//! # Configuration Management
//!
//! Handles configuration for building and querying vocabulary structures.
//!
//! Configuration is plain serde data with defaults for every field, so a
//! TOML file only needs to name what it changes:
//!
//! ```toml
//! [tree]
//! max_clusters_per_level = 8
//! initialization_strategy = "pure_random"
//!
//! [matching]
//! mode = "all_good_leafs_1"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{MatchingMode, Parameters};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tree: Parameters,
    pub forest: ForestConfig,
    pub matching: MatchingConfig,
    pub workers: WorkerConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text).map_err(|e| match e {
            Error::Configuration { message } => Error::Configuration {
                message: format!("{}: {}", path.display(), message),
            },
            other => other,
        })
    }

    /// Render configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Configuration {
            message: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.tree.validate()?;
        if self.forest.trees == 0 {
            return Err(Error::Configuration {
                message: "forest.trees must be at least 1".to_string(),
            });
        }
        if let Some(max) = self.matching.max_distance {
            if !(max >= 0.0) {
                return Err(Error::Configuration {
                    message: format!("matching.max_distance must be non-negative, got {}", max),
                });
            }
        }
        if self.workers.threads == Some(0) {
            return Err(Error::Configuration {
                message: "workers.threads must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Forest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of independently clustered trees
    pub trees: usize,
    /// Seed for reproducible construction (None = entropy)
    pub seed: Option<u64>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            trees: 1,
            seed: None,
        }
    }
}

/// Matching configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub mode: MatchingMode,
    /// Largest distance reported by batch matching (None = no limit)
    pub max_distance: Option<f64>,
}

/// Worker pool configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of worker threads (None = one per core, Some(1) = serial)
    pub threads: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
        }
    }
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
