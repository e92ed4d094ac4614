//! File exporter implementation

use crate::core::{Exporter, LogEvent, LoggerError, Result};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appends one text line per event
///
/// The file is locked exclusively for the exporter's lifetime so two
/// pipelines cannot interleave writes into the same log.
pub struct FileExporter {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileExporter {
    /// Open `path` for appending, creating it and its parent directories
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or another exporter holds its lock.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation("creating log directory", parent.display().to_string(), e)
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                LoggerError::io_operation("opening log file", path.display().to_string(), e)
            })?;

        file.try_lock_exclusive().map_err(|e| {
            LoggerError::io_operation("locking log file", path.display().to_string(), e)
        })?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Exporter for FileExporter {
    fn export(&self, event: &LogEvent) -> Result<()> {
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", event)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.writer.lock().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl Drop for FileExporter {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed to disk
        let writer = self.writer.get_mut();
        let _ = writer.flush();
        let _ = writer.get_ref().unlock();
    }
}
