//! Console mirror
//!
//! Echoes written records to stdout with their category prefixed. The sink is
//! locked only around the write itself so other console writers in the host
//! interleave at line granularity.

use std::io::{self, Write};

use parking_lot::Mutex;

use crate::record::Record;

/// Serialized echo of records to a console-like sink
pub struct ConsoleMirror {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleMirror {
    /// Mirror to the process's standard output
    pub fn stdout() -> Self {
        Self::with_sink(Box::new(io::stdout()))
    }

    /// Mirror to an arbitrary sink
    pub fn with_sink(sink: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    /// Render a record the way it appears on the console
    pub fn format(record: &Record) -> String {
        format!("[{}] {}\n", record.category, record.format_line())
    }

    /// Echo one record; failures are reported, not returned
    pub fn echo(&self, record: &Record) {
        let text = Self::format(record);
        let result = {
            let mut sink = self.sink.lock();
            sink.write_all(text.as_bytes()).and_then(|_| sink.flush())
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Console mirror write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Category, Level};
    use std::sync::Arc;

    /// Sink that appends into a shared buffer
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_echo_prefixes_category() {
        let buf = SharedBuf::default();
        let mirror = ConsoleMirror::with_sink(Box::new(buf.clone()));

        mirror.echo(&Record::new(Level::Warning, Category::Graphics, "low fps"));

        let text = String::from_utf8(buf.0.lock().clone()).unwrap();
        assert!(text.starts_with("[graphics] "));
        assert!(text.ends_with("[warning]: low fps\n"));
    }

    #[test]
    fn test_concurrent_echo_keeps_lines_whole() {
        let buf = SharedBuf::default();
        let mirror = Arc::new(ConsoleMirror::with_sink(Box::new(buf.clone())));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let mirror = Arc::clone(&mirror);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let msg = format!("thread {} line {}", t, i);
                        mirror.echo(&Record::new(Level::Debug, Category::Runtime, msg));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let text = String::from_utf8(buf.0.lock().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 200);
        assert!(lines
            .iter()
            .all(|l| l.starts_with("[runtime] ") && l.contains("[debug]: thread ")));
    }
}
