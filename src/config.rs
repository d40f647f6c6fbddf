//! Configuration management for chanlog
//!
//! Settings are read once when a `Pipeline` is constructed. Edits made to a
//! config value afterwards do not reach a running pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ChanlogError, Result};
use crate::identity::AppIdentity;
use crate::record::Level;
use crate::retention::DEFAULT_RETENTION_DAYS;

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Records below this level are dropped before they are queued
    #[serde(default = "default_min_level")]
    pub min_level: Level,

    /// Echo every written record to stdout
    #[serde(default)]
    pub console_mirror: bool,

    /// Delete log files older than this many days at startup (0 disables)
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,

    /// Application name for file headers (default: executable name)
    #[serde(default)]
    pub app_name: Option<String>,

    /// Application version for file headers (default: "unknown")
    #[serde(default)]
    pub app_version: Option<String>,

    /// Directory for category log files (default: ~/.chanlog/logs)
    #[serde(default)]
    pub logs_dir: Option<PathBuf>,

    /// How long shutdown waits for the queue to drain (default: 1000ms)
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    /// Idle wait between polls of an empty queue (default: 50ms)
    #[serde(default = "default_idle_wait_ms")]
    pub idle_wait_ms: u64,

    /// Longest a producer blocks before the pipeline has started (default: 2000ms)
    #[serde(default = "default_startup_wait_ms")]
    pub startup_wait_ms: u64,

    /// Most records held while no drain thread is running; extras are discarded
    #[serde(default = "default_startup_backlog")]
    pub startup_backlog: usize,
}

fn default_min_level() -> Level {
    Level::Debug
}

fn default_retention_days() -> u64 {
    DEFAULT_RETENTION_DAYS
}

fn default_shutdown_timeout_ms() -> u64 {
    1000
}

fn default_idle_wait_ms() -> u64 {
    50
}

fn default_startup_wait_ms() -> u64 {
    2000
}

fn default_startup_backlog() -> usize {
    10_000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_level: default_min_level(),
            console_mirror: false,
            retention_days: default_retention_days(),
            app_name: None,
            app_version: None,
            logs_dir: None,
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            idle_wait_ms: default_idle_wait_ms(),
            startup_wait_ms: default_startup_wait_ms(),
            startup_backlog: default_startup_backlog(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from `path`, or return defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ChanlogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ChanlogError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the default location (~/.chanlog/config.toml)
    pub fn load_default() -> Result<Self> {
        Self::load(&config_file_path())
    }

    /// Save configuration to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        let io_err = |source| ChanlogError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| ChanlogError::InvalidConfig {
            field: "config",
            reason: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(io_err)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.idle_wait_ms == 0 {
            return Err(ChanlogError::InvalidConfig {
                field: "idle_wait_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.shutdown_timeout_ms == 0 {
            return Err(ChanlogError::InvalidConfig {
                field: "shutdown_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Directory category files are written to
    pub fn resolved_logs_dir(&self) -> PathBuf {
        self.logs_dir.clone().unwrap_or_else(logs_dir)
    }

    /// Application identity for file headers
    pub fn identity(&self) -> AppIdentity {
        AppIdentity::resolve(self.app_name.as_deref(), self.app_version.as_deref())
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }

    pub fn startup_wait(&self) -> Duration {
        Duration::from_millis(self.startup_wait_ms)
    }
}

/// Home of chanlog's config file and default logs directory (`~/.chanlog`)
///
/// Without a resolvable home directory the pipeline still needs somewhere to
/// write, so this drops back to `./.chanlog` relative to the process.
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("No home directory; chanlog files go under ./.chanlog");
        PathBuf::from(".chanlog")
    })
}

/// `~/.chanlog`, or `None` when the platform reports no home directory
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".chanlog"))
}

/// `config.toml` read by [`PipelineConfig::load_default`] and the binary
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Category files land here when `logs_dir` is not set in the config
pub fn logs_dir() -> PathBuf {
    config_dir().join("logs")
}
