//! chanlog - asynchronous multi-category logging pipeline
//!
//! Records from any thread are queued without blocking and written by a single
//! background thread into one file per category per run. Startup is gated so
//! early records are not lost, stale files are swept on start, and shutdown
//! drains the queue under a fixed deadline.
//!
//! ```no_run
//! use chanlog::{Category, Level, Pipeline, PipelineConfig};
//!
//! let pipeline = Pipeline::new(PipelineConfig::default());
//! pipeline.initialize()?;
//! pipeline.log(Level::Warning, Category::Network, "connection reset");
//! let report = pipeline.shutdown();
//! assert!(report.drained);
//! # Ok::<(), chanlog::ChanlogError>(())
//! ```

pub mod config;
pub mod console;
pub mod diagnostics;
pub mod error;
pub mod gate;
pub mod identity;
pub mod panic_hook;
pub mod pipeline;
pub mod queue;
pub mod record;
pub mod retention;
pub mod stats;
pub mod storage;
pub mod writer;

pub use config::PipelineConfig;
pub use error::{ChanlogError, Result};
pub use pipeline::{Logger, Pipeline, PipelineState, ShutdownReport};
pub use record::{Category, Level, Record};
pub use stats::StatsSnapshot;
pub use storage::{FsStorage, StorageRoot};
