//! Panic hook integration test
//!
//! Lives in its own test binary because the panic hook is process-wide.

mod common;

use std::sync::Arc;

use chanlog::{panic_hook, Category, Level, Pipeline, PipelineState};
use tempfile::TempDir;

use common::{read_messages, test_config};

#[test]
fn test_panic_is_logged_and_pipeline_stopped() {
    let temp_dir = TempDir::new().unwrap();
    let pipeline = Arc::new(Pipeline::new(test_config(temp_dir.path())));
    panic_hook::install(&pipeline);
    pipeline.initialize().unwrap();

    pipeline.log(Level::Verbose, Category::Runtime, "about to fail");
    let worker = std::thread::Builder::new()
        .name("doomed".to_string())
        .spawn(|| panic!("reactor core breach"))
        .unwrap();
    assert!(worker.join().is_err());

    assert_eq!(pipeline.state(), PipelineState::Stopped);
    let messages = read_messages(&pipeline.log_path(Category::Runtime).unwrap());
    assert_eq!(messages[0], "about to fail");
    assert!(messages[1].starts_with("thread 'doomed' panicked at "));
    assert!(messages[1].contains("reactor core breach"));

    let _ = std::panic::take_hook();
}
