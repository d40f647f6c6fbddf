//! Error types for the pipeline
//!
//! Only lifecycle setup and config loading can fail. The producer path and
//! shutdown absorb their failures and never surface a `ChanlogError`.

use std::path::PathBuf;

/// All chanlog errors
#[derive(Debug, thiserror::Error)]
pub enum ChanlogError {
    /// File system operation failed
    #[error("IO error: {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be parsed
    #[error("Cannot parse config file {}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Invalid config value
    #[error("Invalid {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// The drain thread could not be started
    #[error("Failed to spawn drain thread")]
    SpawnWorker(#[source] std::io::Error),
}

/// Alias for Result with ChanlogError
pub type Result<T> = std::result::Result<T, ChanlogError>;
