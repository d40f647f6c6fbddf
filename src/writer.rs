//! Per-category writers
//!
//! One append-mode file per category per run, opened lazily on the first
//! record for that category. File names embed the run start timestamp so
//! separate runs never share a file.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;

use crate::identity::{self, AppIdentity};
use crate::record::{Category, Level, Record};
use crate::storage::{OutputStream, StorageRoot};

/// Pattern matching every file this crate produces
pub const LOG_FILE_PATTERN: &str = "*.log";

const HEADER_RULE: &str = "================================================================";

/// File name for a category in the run started at `run_started` (unix seconds)
pub fn log_file_name(run_started: i64, category: Category) -> String {
    format!("{}.{}.log", run_started, category.as_str())
}

/// Check that a file name has the `<timestamp>.<category>.log` shape
pub fn is_log_file_name(name: &str) -> bool {
    let Some(stem) = name.strip_suffix(".log") else {
        return false;
    };
    let Some((timestamp, category)) = stem.split_once('.') else {
        return false;
    };
    !timestamp.is_empty()
        && timestamp.bytes().all(|b| b.is_ascii_digit())
        && category.parse::<Category>().is_ok()
}

/// What goes into the header block of every new file
#[derive(Debug, Clone)]
pub struct HeaderInfo {
    pub min_level: Level,
    pub identity: AppIdentity,
}

impl HeaderInfo {
    /// Render the header block for one category
    pub fn render(&self, category: Category) -> String {
        let mut out = String::new();
        out.push_str(HEADER_RULE);
        out.push('\n');
        out.push_str(&format!("Category:      {}\n", category));
        out.push_str(&format!("Minimum level: {}\n", self.min_level));
        out.push_str(&format!(
            "Application:   {} {}\n",
            self.identity.name, self.identity.version
        ));
        out.push_str(&format!("Framework:     {}\n", identity::framework_version()));
        out.push_str(&format!("OS:            {}\n", identity::os_description()));
        out.push_str(&format!("CPU:           {}\n", identity::cpu_description()));
        out.push_str(HEADER_RULE);
        out.push('\n');
        out
    }
}

/// An open output file bound to one category
pub struct WriterEntry {
    name: String,
    out: OutputStream,
}

impl WriterEntry {
    /// File name of this entry inside the storage root
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append one formatted record and flush it
    pub fn write_record(&mut self, record: &Record) -> io::Result<()> {
        self.out.write_all(record.format_line().as_bytes())?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }

    fn close(mut self) -> io::Result<()> {
        self.out.flush()
    }
}

fn open_entry(
    storage: &dyn StorageRoot,
    run_started: i64,
    header: &HeaderInfo,
    category: Category,
) -> io::Result<WriterEntry> {
    let name = log_file_name(run_started, category);
    let mut out = storage.open_append(&name)?;
    out.write_all(header.render(category).as_bytes())?;
    out.flush()?;
    tracing::debug!(
        category = %category,
        path = %storage.full_path(&name).display(),
        "Opened category log file"
    );
    Ok(WriterEntry { name, out })
}

/// Lazily populated map from category to its writer
///
/// Owned by the drain thread; not shared.
pub struct WriterRegistry {
    storage: Arc<dyn StorageRoot>,
    run_started: i64,
    header: HeaderInfo,
    entries: HashMap<Category, WriterEntry>,
}

impl WriterRegistry {
    pub fn new(storage: Arc<dyn StorageRoot>, run_started: i64, header: HeaderInfo) -> Self {
        Self {
            storage,
            run_started,
            header,
            entries: HashMap::new(),
        }
    }

    /// Get the writer for `category`, opening it and writing its header on first use
    pub fn get_or_create(&mut self, category: Category) -> io::Result<&mut WriterEntry> {
        match self.entries.entry(category) {
            Entry::Occupied(slot) => Ok(slot.into_mut()),
            Entry::Vacant(slot) => {
                let entry =
                    open_entry(self.storage.as_ref(), self.run_started, &self.header, category)?;
                Ok(slot.insert(entry))
            }
        }
    }

    /// Resolve the writer and append `record` to it
    pub fn write(&mut self, record: &Record) -> io::Result<()> {
        self.get_or_create(record.category)?.write_record(record)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, category: Category) -> bool {
        self.entries.contains_key(&category)
    }

    /// Flush and release every writer; failures are reported, not returned
    pub fn close_all(&mut self) {
        for (category, entry) in self.entries.drain() {
            let name = entry.name.clone();
            if let Err(e) = entry.close() {
                tracing::error!(category = %category, file = %name, error = %e, "Failed to flush log file");
            }
        }
    }
}

impl Drop for WriterRegistry {
    fn drop(&mut self) {
        self.close_all();
    }
}
