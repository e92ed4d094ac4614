//! JSON exporter for structured logging

use crate::core::{Exporter, LogEvent, LoggerError, Result};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// JSON file exporter for structured logging
///
/// Writes each event as a single-line JSON object (JSONL format).
/// Compatible with log aggregation tools like ELK, Loki, etc.
pub struct JsonExporter {
    writer: Mutex<BufWriter<File>>,
    pretty: bool,
}

impl JsonExporter {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(path.as_ref(), false)
    }

    /// Multi-line output, for reading by humans rather than tools
    pub fn new_pretty<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(path.as_ref(), true)
    }

    fn open(path: &Path, pretty: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                LoggerError::io_operation("opening JSON log", path.display().to_string(), e)
            })?;

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            pretty,
        })
    }
}

impl Exporter for JsonExporter {
    fn export(&self, event: &LogEvent) -> Result<()> {
        let mut writer = self.writer.lock();
        if self.pretty {
            serde_json::to_writer_pretty(&mut *writer, event)?;
        } else {
            serde_json::to_writer(&mut *writer, event)?;
        }
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.writer.lock().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "json"
    }
}
