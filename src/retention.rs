//! Log file retention management
//!
//! Deletes category log files older than the retention window. Runs once per
//! pipeline start, before the drain loop accepts records.

use std::io;
use std::time::{Duration, SystemTime};

use crate::storage::StorageRoot;
use crate::writer::{is_log_file_name, LOG_FILE_PATTERN};

/// Default retention period in days
pub const DEFAULT_RETENTION_DAYS: u64 = 7;

/// A stale file that could not be removed
#[derive(Debug)]
pub struct SweepFailure {
    pub name: String,
    pub error: io::Error,
}

/// Result of one retention sweep
#[derive(Debug, Default)]
pub struct SweepOutcome {
    /// Files removed
    pub deleted: Vec<String>,
    /// Files that were stale but could not be removed
    pub failures: Vec<SweepFailure>,
}

/// Delete log files last modified more than `retention_days` before `now`
///
/// A zero retention disables the sweep. Per-file failures are collected and
/// the sweep carries on with the remaining files.
pub fn sweep(storage: &dyn StorageRoot, retention_days: u64, now: SystemTime) -> SweepOutcome {
    let mut outcome = SweepOutcome::default();

    if retention_days == 0 || !storage.dir_exists("") {
        return outcome;
    }

    let retention = Duration::from_secs(retention_days.saturating_mul(24 * 60 * 60));
    let cutoff = now.checked_sub(retention).unwrap_or(SystemTime::UNIX_EPOCH);

    let names = match storage.list_files(LOG_FILE_PATTERN) {
        Ok(names) => names,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to list log files for retention sweep");
            return outcome;
        }
    };

    for name in names.into_iter().filter(|n| is_log_file_name(n)) {
        let modified = match storage.modified(&name) {
            Ok(modified) => modified,
            Err(e) => {
                tracing::debug!(file = %name, error = %e, "Skipping log file without mtime");
                continue;
            }
        };
        if modified >= cutoff {
            continue;
        }
        match storage.delete(&name) {
            Ok(()) => outcome.deleted.push(name),
            Err(error) => outcome.failures.push(SweepFailure { name, error }),
        }
    }

    outcome
}
