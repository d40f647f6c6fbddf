//! Shared helpers for pipeline integration tests

#![allow(dead_code)]

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chanlog::storage::OutputStream;
use chanlog::{FsStorage, PipelineConfig, StorageRoot};
use parking_lot::Mutex;
use tempfile::TempDir;

/// Config pointing at `dir` with short timings for tests
pub fn test_config(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        logs_dir: Some(dir.to_path_buf()),
        app_name: Some("chanlog-tests".to_string()),
        app_version: Some("0.0.0".to_string()),
        idle_wait_ms: 10,
        startup_wait_ms: 200,
        ..PipelineConfig::default()
    }
}

/// Messages written to a category file, header excluded
pub fn read_messages(path: &Path) -> Vec<String> {
    let content = std::fs::read_to_string(path).unwrap_or_default();
    content
        .lines()
        .filter_map(|line| line.split_once("]: ").map(|(_, msg)| msg.to_string()))
        .collect()
}

/// Create a file in `dir` with its mtime pushed `age` into the past
pub fn touch_aged(dir: &Path, name: &str, age: Duration) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, "old run\n").unwrap();
    let file = std::fs::File::options().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
    path
}

/// How a `TestStorage` misbehaves
#[derive(Clone, Copy)]
pub enum Fault {
    /// Fail any write whose bytes contain this marker
    FailOn(&'static str),
    /// Sleep this long on every flush
    SlowFlush(Duration),
    /// Refuse to delete files whose name contains this marker
    FailDelete(&'static str),
}

/// Real directory storage whose writers misbehave on demand
pub struct TestStorage {
    inner: FsStorage,
    fault: Fault,
    opened: Mutex<Vec<String>>,
}

impl TestStorage {
    pub fn new(dir: &TempDir, fault: Fault) -> Arc<Self> {
        Arc::new(Self {
            inner: FsStorage::new(dir.path()),
            fault,
            opened: Mutex::new(Vec::new()),
        })
    }

    /// Names passed to `open_append`, in call order
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }
}

struct FaultyWriter {
    inner: OutputStream,
    fault: Fault,
}

impl Write for FaultyWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Fault::FailOn(marker) = self.fault {
            if buf
                .windows(marker.len())
                .any(|window| window == marker.as_bytes())
            {
                return Err(io::Error::new(io::ErrorKind::Other, "injected write failure"));
            }
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Fault::SlowFlush(delay) = self.fault {
            std::thread::sleep(delay);
        }
        self.inner.flush()
    }
}

impl StorageRoot for TestStorage {
    fn open_append(&self, name: &str) -> io::Result<OutputStream> {
        self.opened.lock().push(name.to_string());
        Ok(Box::new(FaultyWriter {
            inner: self.inner.open_append(name)?,
            fault: self.fault,
        }))
    }

    fn dir_exists(&self, relative: &str) -> bool {
        self.inner.dir_exists(relative)
    }

    fn ensure_root(&self) -> io::Result<()> {
        self.inner.ensure_root()
    }

    fn list_files(&self, pattern: &str) -> io::Result<Vec<String>> {
        self.inner.list_files(pattern)
    }

    fn modified(&self, name: &str) -> io::Result<SystemTime> {
        self.inner.modified(name)
    }

    fn delete(&self, name: &str) -> io::Result<()> {
        if let Fault::FailDelete(marker) = self.fault {
            if name.contains(marker) {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "injected delete failure",
                ));
            }
        }
        self.inner.delete(name)
    }

    fn full_path(&self, name: &str) -> PathBuf {
        self.inner.full_path(name)
    }
}

/// Cloneable in-memory sink for console mirror output
#[derive(Clone, Default)]
pub struct CaptureSink(pub Arc<Mutex<Vec<u8>>>);

impl CaptureSink {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for CaptureSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
