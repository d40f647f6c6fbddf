//! Pipeline counters
//!
//! Lock-free counters updated by producers and the drain thread.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared between producers and the drain thread
#[derive(Debug, Default)]
pub struct PipelineStats {
    /// Records accepted into the queue
    enqueued: AtomicU64,
    /// Records dropped for being below the minimum level
    filtered: AtomicU64,
    /// Records appended to a category file
    written: AtomicU64,
    /// Records lost to a write error
    write_failures: AtomicU64,
    /// Records dropped by a shutdown deadline or after shutdown
    discarded: AtomicU64,
    /// Stale files removed by the retention sweep
    files_swept: AtomicU64,
    /// Stale files the sweep could not remove
    sweep_failures: AtomicU64,
}

/// Point-in-time copy of `PipelineStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub enqueued: u64,
    pub filtered: u64,
    pub written: u64,
    pub write_failures: u64,
    pub discarded: u64,
    pub files_swept: u64,
    pub sweep_failures: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_written(&self) {
        self.written.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_discarded(&self, count: u64) {
        self.discarded.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_sweep(&self, deleted: u64, failed: u64) {
        self.files_swept.fetch_add(deleted, Ordering::Relaxed);
        self.sweep_failures.fetch_add(failed, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            files_swept: self.files_swept.load(Ordering::Relaxed),
            sweep_failures: self.sweep_failures.load(Ordering::Relaxed),
        }
    }
}
