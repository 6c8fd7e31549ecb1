//! Planner configuration
//!
//! Loaded from a JSON file; every field has a default so an empty object
//! is a valid configuration.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{Event, Logger, Severity};
use crate::offset::ResumeMode;
use crate::stats::{DirectoryStatsSource, StatisticsFactory, StatsLoader};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Offset behaviour
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetConfig {
    /// Whether keyset scans return the anchor row (default: inclusive)
    #[serde(default)]
    pub resume: ResumeMode,
}

/// Statistics behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Use guidepost statistics at all (default: true)
    #[serde(default = "default_stats_enabled")]
    pub enabled: bool,

    /// Root of a statistics directory (default: none)
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_stats_enabled() -> bool {
    true
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enabled: default_stats_enabled(),
            directory: None,
        }
    }
}

/// Logging behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Events below this severity are dropped (default: INFO)
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,
}

fn default_min_severity() -> Severity {
    Severity::Info
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            min_severity: default_min_severity(),
        }
    }
}

/// Top-level planner configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub offset: OffsetConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PlannerConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        let path_str = path.display().to_string();
        Logger::info(Event::ConfigLoaded, &[("path", path_str.as_str())]);
        Ok(config)
    }

    /// Applies the logging section process-wide
    pub fn apply_logging(&self) {
        Logger::set_min_severity(self.logging.min_severity);
    }

    /// Statistics factory over the configured directory, if one is set
    pub fn statistics_factory(&self) -> Option<StatisticsFactory<DirectoryStatsSource>> {
        let directory = self.stats.directory.as_ref()?;
        let loader = StatsLoader::new(DirectoryStatsSource::new(directory.clone()));
        Some(StatisticsFactory::new(loader).enabled(self.stats.enabled))
    }
}
