//! Pipeline controller
//!
//! Owns the lifecycle (`initialize` / `shutdown`) and the single drain thread.
//! Producers go through a [`Logger`] handle: level filter, startup gate, then a
//! non-blocking push onto the ingest queue. The drain thread pops records in
//! FIFO order and appends each to its category file.
//!
//! Each `Pipeline` owns its queue, gate and writer registry, so independent
//! instances never share state.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};

use chrono::Utc;
use parking_lot::{Condvar, Mutex};

use crate::config::PipelineConfig;
use crate::console::ConsoleMirror;
use crate::error::{ChanlogError, Result};
use crate::gate::{GateState, StartupGate};
use crate::queue::{Dequeued, IngestQueue};
use crate::record::{Category, Level, Record};
use crate::retention;
use crate::stats::{PipelineStats, StatsSnapshot};
use crate::storage::{FsStorage, StorageRoot};
use crate::writer::{log_file_name, HeaderInfo, WriterRegistry};

/// Upper bound on waiting for a freshly spawned drain thread to report in
const WORKER_START_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Initializing,
    Running,
    Stopping,
    Stopped,
}

/// Outcome of a shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// The drain thread emptied the queue and exited before the deadline
    pub drained: bool,
    /// Records dropped because the deadline elapsed first
    pub discarded: u64,
    /// Time spent inside `shutdown`
    pub elapsed: Duration,
}

impl Default for ShutdownReport {
    fn default() -> Self {
        Self {
            drained: true,
            discarded: 0,
            elapsed: Duration::ZERO,
        }
    }
}

/// One-shot signal raised by the drain thread as it exits
struct ExitLatch {
    done: Mutex<bool>,
    changed: Condvar,
}

impl ExitLatch {
    fn new() -> Self {
        Self {
            done: Mutex::new(false),
            changed: Condvar::new(),
        }
    }

    fn signal(&self) {
        *self.done.lock() = true;
        self.changed.notify_all();
    }

    /// Wait until signalled or `deadline`; returns whether it was signalled
    fn wait_until(&self, deadline: Instant) -> bool {
        let mut done = self.done.lock();
        while !*done {
            if self.changed.wait_until(&mut done, deadline).timed_out() {
                break;
            }
        }
        *done
    }
}

/// State shared by producers and the drain thread
struct Shared {
    queue: IngestQueue,
    gate: StartupGate,
    stats: PipelineStats,
    exit: ExitLatch,
    min_level: Level,
    startup_wait: Duration,
    startup_backlog: usize,
}

impl Shared {
    fn accepts(&self, level: Level) -> bool {
        if level < self.min_level {
            self.stats.add_filtered();
            return false;
        }
        true
    }

    /// Queue a record, counting it as discarded if the queue refuses it
    ///
    /// While nothing drains the queue, at most `startup_backlog` records are
    /// held.
    fn enqueue(&self, record: Record, gate: GateState) {
        let accepted = match gate {
            GateState::Open => self.queue.enqueue(record),
            GateState::Closed => self.queue.enqueue_bounded(record, self.startup_backlog),
            GateState::Sealed => false,
        };
        if accepted {
            self.stats.add_enqueued();
        } else {
            self.stats.add_discarded(1);
        }
    }

    /// Queue a record produced by the pipeline itself, skipping the gate
    fn push_internal(&self, record: Record) {
        if self.accepts(record.level) {
            self.enqueue(record, GateState::Open);
        }
    }
}

/// Cheap, cloneable producer handle
///
/// Every call is non-blocking once the pipeline is running. Before that, the
/// first call waits on the startup gate for at most the configured startup
/// wait; once that wait has run out, calls queue without blocking until the
/// startup backlog is full and discard after that.
#[derive(Clone)]
pub struct Logger {
    shared: Arc<Shared>,
}

impl Logger {
    /// Submit a prebuilt record
    pub fn submit(&self, record: Record) {
        if !self.shared.accepts(record.level) {
            return;
        }
        let gate = self.shared.gate.wait(self.shared.startup_wait);
        self.shared.enqueue(record, gate);
    }

    pub fn log(&self, level: Level, category: Category, message: impl Into<String>) {
        self.submit(Record::new(level, category, message));
    }

    pub fn debug(&self, category: Category, message: impl Into<String>) {
        self.log(Level::Debug, category, message);
    }

    pub fn verbose(&self, category: Category, message: impl Into<String>) {
        self.log(Level::Verbose, category, message);
    }

    pub fn warning(&self, category: Category, message: impl Into<String>) {
        self.log(Level::Warning, category, message);
    }

    pub fn error(&self, category: Category, message: impl Into<String>) {
        self.log(Level::Error, category, message);
    }

    pub fn fatal(&self, category: Category, message: impl Into<String>) {
        self.log(Level::Fatal, category, message);
    }

    /// Log an error with its full cause chain as one multi-line message
    pub fn error_chain(&self, category: Category, error: &anyhow::Error) {
        self.log(Level::Error, category, format!("{:?}", error));
    }

    /// Minimum level this handle lets through
    pub fn min_level(&self) -> Level {
        self.shared.min_level
    }
}

struct Lifecycle {
    state: PipelineState,
    worker: Option<JoinHandle<()>>,
    run_started: Option<i64>,
}

/// Asynchronous multi-category logging pipeline
pub struct Pipeline {
    config: PipelineConfig,
    storage: Arc<dyn StorageRoot>,
    mirror: Option<Arc<ConsoleMirror>>,
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
}

impl Pipeline {
    /// Create a pipeline writing into the configured logs directory
    pub fn new(config: PipelineConfig) -> Self {
        let storage = Arc::new(FsStorage::new(config.resolved_logs_dir()));
        Self::with_storage(config, storage)
    }

    /// Create a pipeline on top of an explicit storage root
    pub fn with_storage(config: PipelineConfig, storage: Arc<dyn StorageRoot>) -> Self {
        let mirror = config
            .console_mirror
            .then(|| Arc::new(ConsoleMirror::stdout()));
        let shared = Arc::new(Shared {
            queue: IngestQueue::new(),
            gate: StartupGate::new(),
            stats: PipelineStats::new(),
            exit: ExitLatch::new(),
            min_level: config.min_level,
            startup_wait: config.startup_wait(),
            startup_backlog: config.startup_backlog,
        });
        Self {
            config,
            storage,
            mirror,
            shared,
            lifecycle: Mutex::new(Lifecycle {
                state: PipelineState::Idle,
                worker: None,
                run_started: None,
            }),
        }
    }

    /// Mirror written records to `sink` instead of stdout
    pub fn with_console_sink(mut self, sink: Box<dyn Write + Send>) -> Self {
        self.mirror = Some(Arc::new(ConsoleMirror::with_sink(sink)));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.lifecycle.lock().state
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Number of records waiting to be written
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    /// Unix timestamp embedded in this run's file names, once initialized
    pub fn run_started(&self) -> Option<i64> {
        self.lifecycle.lock().run_started
    }

    /// Full path of the file `category` writes to in this run
    pub fn log_path(&self, category: Category) -> Option<PathBuf> {
        self.run_started()
            .map(|ts| self.storage.full_path(&log_file_name(ts, category)))
    }

    /// Get a producer handle
    pub fn logger(&self) -> Logger {
        Logger {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn submit(&self, record: Record) {
        self.logger().submit(record);
    }

    pub fn log(&self, level: Level, category: Category, message: impl Into<String>) {
        self.logger().log(level, category, message);
    }

    /// Start the drain thread
    ///
    /// Sweeps stale files, spawns the drain thread and returns once it is
    /// running. A no-op unless the pipeline is idle.
    pub fn initialize(&self) -> Result<()> {
        let mut life = self.lifecycle.lock();
        if life.state != PipelineState::Idle {
            tracing::debug!(state = ?life.state, "Initialize ignored");
            return Ok(());
        }
        life.state = PipelineState::Initializing;

        if let Err(source) = self.storage.ensure_root() {
            life.state = PipelineState::Idle;
            return Err(ChanlogError::Io {
                path: self.storage.full_path(""),
                source,
            });
        }

        self.sweep_stale_files();

        let run_started = self.unused_run_stamp(Utc::now().timestamp());
        let registry = WriterRegistry::new(
            Arc::clone(&self.storage),
            run_started,
            HeaderInfo {
                min_level: self.config.min_level,
                identity: self.config.identity(),
            },
        );
        let shared = Arc::clone(&self.shared);
        let mirror = self.mirror.clone();
        let idle_wait = self.config.idle_wait();

        let worker = thread::Builder::new()
            .name("chanlog-drain".to_string())
            .spawn(move || drain_loop(shared, registry, mirror, idle_wait));
        let worker = match worker {
            Ok(handle) => handle,
            Err(e) => {
                life.state = PipelineState::Idle;
                return Err(ChanlogError::SpawnWorker(e));
            }
        };

        // The drain thread opens the gate itself once its loop is running
        if self.shared.gate.wait_open(WORKER_START_TIMEOUT) != GateState::Open {
            tracing::warn!("Drain thread slow to start");
        }

        life.worker = Some(worker);
        life.run_started = Some(run_started);
        life.state = PipelineState::Running;
        tracing::info!(
            dir = %self.storage.full_path("").display(),
            run_started,
            "Logging pipeline running"
        );
        Ok(())
    }

    /// First stamp at or after `now` with no files in the logs directory
    ///
    /// Runs started within the same second would otherwise append into each
    /// other's files.
    fn unused_run_stamp(&self, now: i64) -> i64 {
        let mut ts = now;
        loop {
            match self.storage.list_files(&format!("{}.*.log", ts)) {
                Ok(taken) if !taken.is_empty() => ts += 1,
                Ok(_) => return ts,
                Err(e) => {
                    tracing::warn!(error = %e, "Could not list logs directory");
                    return ts;
                }
            }
        }
    }

    fn sweep_stale_files(&self) {
        let outcome = retention::sweep(
            self.storage.as_ref(),
            self.config.retention_days,
            SystemTime::now(),
        );
        self.shared
            .stats
            .add_sweep(outcome.deleted.len() as u64, outcome.failures.len() as u64);

        if !outcome.deleted.is_empty() {
            tracing::info!(count = outcome.deleted.len(), "Cleaned up old log files");
            self.shared.push_internal(Record::new(
                Level::Verbose,
                Category::Runtime,
                format!(
                    "Removed {} log files older than {} days",
                    outcome.deleted.len(),
                    self.config.retention_days
                ),
            ));
        }
        for failure in outcome.failures {
            tracing::warn!(file = %failure.name, error = %failure.error, "Failed to delete old log file");
            self.shared.push_internal(Record::new(
                Level::Warning,
                Category::Runtime,
                format!(
                    "Failed to delete old log file {}: {}",
                    failure.name, failure.error
                ),
            ));
        }
    }

    /// Stop the drain thread, waiting at most the configured shutdown timeout
    ///
    /// Never fails and never waits past the deadline. Records still queued
    /// when the deadline passes are discarded and counted in the report. A
    /// no-op unless the pipeline is running.
    pub fn shutdown(&self) -> ShutdownReport {
        let started = Instant::now();
        let deadline = started + self.config.shutdown_timeout();

        let Some(mut life) = self.lifecycle.try_lock_until(deadline) else {
            tracing::warn!("Shutdown could not acquire pipeline lifecycle before deadline");
            return ShutdownReport {
                drained: false,
                discarded: 0,
                elapsed: started.elapsed(),
            };
        };
        if life.state != PipelineState::Running {
            return ShutdownReport::default();
        }
        life.state = PipelineState::Stopping;

        self.shared.gate.seal();
        self.shared.queue.cancel();
        let drained = self.shared.exit.wait_until(deadline);

        let discarded = self.shared.queue.close() as u64;
        if drained {
            if let Some(worker) = life.worker.take() {
                let _ = worker.join();
            }
        } else {
            // The drain thread finishes its current write, then closes its files
            life.worker = None;
            tracing::warn!(
                discarded,
                timeout_ms = self.config.shutdown_timeout_ms,
                "Shutdown deadline elapsed before the queue drained"
            );
        }
        self.shared.stats.add_discarded(discarded);

        life.state = PipelineState::Stopped;
        let report = ShutdownReport {
            drained,
            discarded,
            elapsed: started.elapsed(),
        };
        tracing::info!(?report, "Logging pipeline stopped");
        report
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Body of the drain thread
fn drain_loop(
    shared: Arc<Shared>,
    mut registry: WriterRegistry,
    mirror: Option<Arc<ConsoleMirror>>,
    idle_wait: Duration,
) {
    shared.gate.open();

    loop {
        match shared.queue.poll() {
            Dequeued::Record(record) => match registry.write(&record) {
                Ok(()) => {
                    shared.stats.add_written();
                    if let Some(mirror) = &mirror {
                        mirror.echo(&record);
                    }
                }
                Err(e) => {
                    shared.stats.add_write_failure();
                    tracing::error!(
                        category = %record.category,
                        level = %record.level,
                        error = %e,
                        "Failed to write log record"
                    );
                }
            },
            Dequeued::Empty => shared.queue.wait_for_work(idle_wait),
            Dequeued::Finished => break,
        }
    }

    registry.close_all();
    shared.exit.signal();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> PipelineConfig {
        PipelineConfig {
            logs_dir: Some(temp_dir.path().to_path_buf()),
            app_name: Some("test".to_string()),
            app_version: Some("0.0.1".to_string()),
            startup_wait_ms: 100,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_lifecycle_states() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(test_config(&temp_dir));
        assert_eq!(pipeline.state(), PipelineState::Idle);

        pipeline.initialize().unwrap();
        assert_eq!(pipeline.state(), PipelineState::Running);
        assert!(pipeline.run_started().is_some());

        let report = pipeline.shutdown();
        assert!(report.drained);
        assert_eq!(pipeline.state(), PipelineState::Stopped);
    }

    #[test]
    fn test_shutdown_before_initialize_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(test_config(&temp_dir));
        let report = pipeline.shutdown();
        assert_eq!(report, ShutdownReport::default());
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[test]
    fn test_second_shutdown_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(test_config(&temp_dir));
        pipeline.initialize().unwrap();
        pipeline.shutdown();
        let report = pipeline.shutdown();
        assert_eq!(report, ShutdownReport::default());
        assert_eq!(pipeline.state(), PipelineState::Stopped);
    }

    #[test]
    fn test_initialize_after_stop_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(test_config(&temp_dir));
        pipeline.initialize().unwrap();
        pipeline.shutdown();
        pipeline.initialize().unwrap();
        assert_eq!(pipeline.state(), PipelineState::Stopped);
    }

    #[test]
    fn test_records_after_shutdown_are_discarded() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(test_config(&temp_dir));
        pipeline.initialize().unwrap();
        pipeline.shutdown();

        let start = Instant::now();
        pipeline.log(Level::Error, Category::Runtime, "too late");
        assert!(start.elapsed() < Duration::from_millis(100));
        assert_eq!(pipeline.stats().discarded, 1);
        assert_eq!(pipeline.stats().written, 0);
    }

    #[test]
    fn test_record_racing_shutdown_is_counted() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(test_config(&temp_dir));
        pipeline.initialize().unwrap();
        let logger = pipeline.logger();
        pipeline.shutdown();

        // A producer that saw the gate open just before it was sealed
        logger.shared.enqueue(
            Record::new(Level::Error, Category::Runtime, "raced"),
            GateState::Open,
        );
        assert_eq!(pipeline.pending(), 0);
        assert_eq!(pipeline.stats().discarded, 1);
    }

    #[test]
    fn test_backlog_is_capped_while_nothing_drains() {
        let temp_dir = TempDir::new().unwrap();
        let config = PipelineConfig {
            startup_wait_ms: 20,
            startup_backlog: 2,
            ..test_config(&temp_dir)
        };
        let pipeline = Pipeline::new(config);
        for i in 0..5 {
            pipeline.log(Level::Error, Category::Runtime, format!("early {}", i));
        }
        assert_eq!(pipeline.pending(), 2);
        let stats = pipeline.stats();
        assert_eq!(stats.enqueued, 2);
        assert_eq!(stats.discarded, 3);
    }

    #[test]
    fn test_same_second_runs_get_distinct_stamps() {
        let temp_dir = TempDir::new().unwrap();
        let now = Utc::now().timestamp();
        std::fs::write(temp_dir.path().join(format!("{}.runtime.log", now)), "a").unwrap();
        std::fs::write(temp_dir.path().join(format!("{}.audio.log", now + 1)), "b").unwrap();

        let pipeline = Pipeline::new(test_config(&temp_dir));
        assert_eq!(pipeline.unused_run_stamp(now), now + 2);
        assert_eq!(pipeline.unused_run_stamp(now + 5), now + 5);
    }

    #[test]
    fn test_filtered_records_are_counted() {
        let temp_dir = TempDir::new().unwrap();
        let config = PipelineConfig {
            min_level: Level::Error,
            ..test_config(&temp_dir)
        };
        let pipeline = Pipeline::new(config);
        pipeline.initialize().unwrap();
        pipeline.log(Level::Debug, Category::Runtime, "quiet");
        pipeline.log(Level::Warning, Category::Runtime, "quiet");
        pipeline.log(Level::Fatal, Category::Runtime, "loud");
        pipeline.shutdown();

        let stats = pipeline.stats();
        assert_eq!(stats.filtered, 2);
        assert_eq!(stats.enqueued, 1);
        assert_eq!(stats.written, 1);
    }

    #[test]
    fn test_log_path_uses_run_timestamp() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(test_config(&temp_dir));
        assert!(pipeline.log_path(Category::Network).is_none());

        pipeline.initialize().unwrap();
        let ts = pipeline.run_started().unwrap();
        let path = pipeline.log_path(Category::Network).unwrap();
        assert_eq!(path, temp_dir.path().join(format!("{}.network.log", ts)));
        pipeline.shutdown();
    }

    #[test]
    fn test_exit_latch_times_out() {
        let latch = ExitLatch::new();
        assert!(!latch.wait_until(Instant::now() + Duration::from_millis(20)));
        latch.signal();
        assert!(latch.wait_until(Instant::now()));
    }
}
