//! Panic hook integration
//!
//! Records a fatal Runtime entry for a panic and shuts the pipeline down
//! before the previous hook runs, so the panic reaches disk even when the
//! process is about to abort.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic::{self, Location};
use std::sync::{Arc, Weak};

use crate::pipeline::Pipeline;
use crate::record::{Category, Level, Record};

/// Chain a hook that logs panics to `pipeline` and then shuts it down
///
/// Holds only a weak reference; once the pipeline is dropped the hook just
/// forwards to the previous one.
pub fn install(pipeline: &Arc<Pipeline>) {
    let pipeline: Weak<Pipeline> = Arc::downgrade(pipeline);
    let previous = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        if let Some(pipeline) = pipeline.upgrade() {
            pipeline.submit(panic_record(info.location(), info.payload()));
            pipeline.shutdown();
        }
        previous(info);
    }));
}

/// Build the fatal record describing a panic
pub fn panic_record(location: Option<&Location<'_>>, payload: &(dyn Any + Send)) -> Record {
    let location = location
        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
        .unwrap_or_else(|| "unknown location".to_string());
    let thread = std::thread::current();
    let thread_name = thread.name().unwrap_or("<unnamed>");

    let mut message = format!(
        "thread '{}' panicked at {}: {}",
        thread_name,
        location,
        payload_text(payload)
    );
    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        message.push('\n');
        message.push_str(&backtrace.to_string());
    }

    Record::new(Level::Fatal, Category::Runtime, message)
}

fn payload_text(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "Box<dyn Any>"
    }
}
