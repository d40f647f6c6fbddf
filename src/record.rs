//! Log record vocabulary
//!
//! A `Record` is one immutable log event. Producers build it at the call site,
//! the drain loop consumes it exactly once.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Verbose,
    Warning,
    Error,
    Fatal,
}

impl Level {
    /// Get the lowercase name used in output lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Verbose => "verbose",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "verbose" => Ok(Level::Verbose),
            "warning" | "warn" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            other => Err(format!("unknown level '{}'", other)),
        }
    }
}

/// Fixed output channel; each category gets its own file per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Runtime,
    Performance,
    Network,
    Graphics,
    Database,
    Audio,
    Input,
}

impl Category {
    /// Every category, in declaration order
    pub const ALL: [Category; 7] = [
        Category::Runtime,
        Category::Performance,
        Category::Network,
        Category::Graphics,
        Category::Database,
        Category::Audio,
        Category::Input,
    ];

    /// Get the lowercase name used in file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Runtime => "runtime",
            Category::Performance => "performance",
            Category::Network => "network",
            Category::Graphics => "graphics",
            Category::Database => "database",
            Category::Audio => "audio",
            Category::Input => "input",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == lower)
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

/// A single log event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// When the event was created
    pub timestamp: DateTime<Utc>,
    /// Severity
    pub level: Level,
    /// Output channel
    pub category: Category,
    /// Message text, may span several lines
    pub message: String,
}

impl Record {
    /// Create a record stamped with the current time
    pub fn new(level: Level, category: Category, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            category,
            message: message.into(),
        }
    }

    /// Format as an output line: `YYYY-MM-DD HH:mm:ss [level]: message`
    ///
    /// Multi-line messages are kept verbatim.
    pub fn format_line(&self) -> String {
        format!(
            "{} [{}]: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.level,
            self.message
        )
    }
}
