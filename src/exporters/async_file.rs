//! Async exporters and the bridge that runs them on the consumer thread
//!
//! [`AsyncFileExporter`] uses `tokio::fs` for fully asynchronous file I/O.
//! The consumer itself is a plain thread, so async exporters are driven
//! through [`BlockingExporter`], which owns a current-thread runtime and
//! blocks on each call.

use crate::core::{Exporter, LogEvent, LoggerError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::runtime::{Builder, Runtime};

/// Trait for asynchronous exporters
///
/// # Example
///
/// ```no_run
/// use rust_async_logger::core::{LogEvent, Result};
/// use rust_async_logger::exporters::AsyncExporter;
/// use async_trait::async_trait;
///
/// struct MyAsyncExporter;
///
/// #[async_trait]
/// impl AsyncExporter for MyAsyncExporter {
///     async fn export(&mut self, event: &LogEvent) -> Result<()> {
///         // Async event writing logic
///         Ok(())
///     }
///
///     async fn flush(&mut self) -> Result<()> {
///         Ok(())
///     }
///
///     fn name(&self) -> &str {
///         "my_async_exporter"
///     }
/// }
/// ```
#[async_trait]
pub trait AsyncExporter: Send + Sync {
    async fn export(&mut self, event: &LogEvent) -> Result<()>;

    async fn flush(&mut self) -> Result<()>;

    fn name(&self) -> &str;
}

/// Async file exporter for non-blocking file writes
///
/// # Important: Explicit Flush Required
///
/// Buffered data (up to `buffer_size` bytes) is lost if the exporter is
/// dropped without `flush()`. Through [`BlockingExporter`] the consumer
/// flushes after every batch and on shutdown.
pub struct AsyncFileExporter {
    writer: BufWriter<File>,
    path: PathBuf,
    buffer_size: usize,
}

impl AsyncFileExporter {
    /// Default buffer size (64 KB)
    pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

    /// # Errors
    ///
    /// Returns error if file cannot be created or opened
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_buffer_size(path, Self::DEFAULT_BUFFER_SIZE).await
    }

    /// # Errors
    ///
    /// Returns error if file cannot be created or opened
    pub async fn with_buffer_size(path: impl AsRef<Path>, buffer_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| {
                LoggerError::io_operation("opening log file", path.display().to_string(), e)
            })?;

        Ok(Self {
            writer: BufWriter::with_capacity(buffer_size, file),
            path,
            buffer_size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

#[async_trait]
impl AsyncExporter for AsyncFileExporter {
    async fn export(&mut self, event: &LogEvent) -> Result<()> {
        let line = format!("{}\n", event);
        self.writer.write_all(line.as_bytes()).await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "async_file"
    }
}

/// Runs an [`AsyncExporter`] as a regular [`Exporter`]
///
/// Must not be called from inside another tokio runtime; the consumer
/// thread never is.
pub struct BlockingExporter<A> {
    runtime: Runtime,
    inner: Mutex<A>,
    name: String,
}

impl<A: AsyncExporter> BlockingExporter<A> {
    /// # Errors
    ///
    /// `LifecycleFailure` if the runtime cannot be built.
    pub fn new(exporter: A) -> Result<Self> {
        Ok(Self {
            runtime: runtime()?,
            name: exporter.name().to_string(),
            inner: Mutex::new(exporter),
        })
    }
}

impl BlockingExporter<AsyncFileExporter> {
    /// Open an [`AsyncFileExporter`] on the bridge's own runtime
    pub fn open_file(path: impl AsRef<Path>) -> Result<Self> {
        let runtime = runtime()?;
        let exporter = runtime.block_on(AsyncFileExporter::new(path))?;
        Ok(Self {
            runtime,
            name: exporter.name().to_string(),
            inner: Mutex::new(exporter),
        })
    }
}

fn runtime() -> Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| LoggerError::lifecycle("startup", format!("cannot build async runtime: {}", e)))
}

impl<A: AsyncExporter> Exporter for BlockingExporter<A> {
    fn export(&self, event: &LogEvent) -> Result<()> {
        let mut inner = self.inner.lock();
        self.runtime.block_on(inner.export(event))
    }

    fn flush(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        self.runtime.block_on(inner.flush())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
