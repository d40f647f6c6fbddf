//! Storage root abstraction
//!
//! The pipeline only touches disk through `StorageRoot`, which keeps the drain
//! loop testable with in-memory or failing storage.

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Append-mode output stream handed out by a storage root
pub type OutputStream = Box<dyn Write + Send>;

/// Directory-like capability the pipeline writes into
pub trait StorageRoot: Send + Sync {
    /// Open `name` for appending, creating it if needed. Other processes may
    /// read the file while it is open.
    fn open_append(&self, name: &str) -> io::Result<OutputStream>;

    /// Check whether the relative directory exists (`""` is the root itself)
    fn dir_exists(&self, relative: &str) -> bool;

    /// Create the root directory if it is missing
    fn ensure_root(&self) -> io::Result<()>;

    /// List file names in the root matching a `*` wildcard pattern
    fn list_files(&self, pattern: &str) -> io::Result<Vec<String>>;

    /// Last modification time of a file
    fn modified(&self, name: &str) -> io::Result<SystemTime>;

    /// Delete a file
    fn delete(&self, name: &str) -> io::Result<()>;

    /// Resolve a relative name to a full path
    fn full_path(&self, name: &str) -> PathBuf;
}

/// Match `name` against a pattern with at most one `*` wildcard
pub fn matches_pattern(pattern: &str, name: &str) -> bool {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            name.len() >= prefix.len() + suffix.len()
                && name.starts_with(prefix)
                && name.ends_with(suffix)
        }
        None => pattern == name,
    }
}

/// Storage root backed by a real directory
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl StorageRoot for FsStorage {
    fn open_append(&self, name: &str) -> io::Result<OutputStream> {
        fs::create_dir_all(&self.root)?;
        // std opens with read sharing on every platform
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.full_path(name))?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn dir_exists(&self, relative: &str) -> bool {
        self.root.join(relative).is_dir()
    }

    fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    fn list_files(&self, pattern: &str) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if matches_pattern(pattern, name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn modified(&self, name: &str) -> io::Result<SystemTime> {
        fs::metadata(self.full_path(name))?.modified()
    }

    fn delete(&self, name: &str) -> io::Result<()> {
        fs::remove_file(self.full_path(name))
    }

    fn full_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}
