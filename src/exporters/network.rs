//! Network exporter for remote logging
//!
//! Sends one text line per event to a remote server over TCP.
//! Useful for centralized logging in distributed systems.

use crate::core::{Exporter, LogEvent, LoggerError, Result};
use parking_lot::Mutex;
use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Network exporter that sends events to a remote TCP server
///
/// # Example
///
/// ```no_run
/// use rust_async_logger::exporters::NetworkExporter;
/// use rust_async_logger::prelude::*;
///
/// let exporter = NetworkExporter::new("127.0.0.1:8080")
///     .expect("Failed to connect to log server");
///
/// let logger = AsyncLogger::builder().exporter(exporter).build().unwrap();
/// logger.info("This event will be sent to 127.0.0.1:8080").unwrap();
/// ```
pub struct NetworkExporter {
    stream: Mutex<Option<TcpStream>>,
    address: String,
    reconnect_on_error: bool,
}

impl NetworkExporter {
    /// Connect to `addr`, e.g. `"localhost:8080"`
    ///
    /// # Errors
    ///
    /// Returns error if connection fails
    pub fn new(addr: impl ToSocketAddrs + ToString) -> Result<Self> {
        let address = addr.to_string();
        let stream = connect(&address)?;

        Ok(Self {
            stream: Mutex::new(Some(stream)),
            address,
            reconnect_on_error: true,
        })
    }

    /// Enable or disable automatic reconnection on errors
    ///
    /// Default: enabled
    #[must_use]
    pub fn with_reconnect(mut self, enable: bool) -> Self {
        self.reconnect_on_error = enable;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

fn connect(address: &str) -> Result<TcpStream> {
    let stream = TcpStream::connect(address)
        .map_err(|e| LoggerError::io_operation("connecting to log server", address, e))?;

    // Set timeouts to prevent hanging
    stream.set_write_timeout(Some(IO_TIMEOUT))?;
    stream.set_read_timeout(Some(IO_TIMEOUT))?;

    // Enable TCP_NODELAY for low-latency logging
    stream.set_nodelay(true)?;
    Ok(stream)
}

impl Exporter for NetworkExporter {
    fn export(&self, event: &LogEvent) -> Result<()> {
        let line = format!("{}\n", event);
        let mut guard = self.stream.lock();

        let error = match guard.as_mut() {
            Some(stream) => match stream.write_all(line.as_bytes()) {
                Ok(()) => return Ok(()),
                Err(e) => e.to_string(),
            },
            None => "not connected".to_string(),
        };

        // Connection lost
        *guard = None;
        if !self.reconnect_on_error {
            return Err(LoggerError::export(self.name(), error));
        }

        match connect(&self.address) {
            Ok(mut stream) => {
                stream.write_all(line.as_bytes())?;
                *guard = Some(stream);
                Ok(())
            }
            Err(reconnect_err) => Err(LoggerError::export(
                self.name(),
                format!(
                    "failed to send event and reconnect: {} (reconnect: {})",
                    error, reconnect_err
                ),
            )),
        }
    }

    fn flush(&self) -> Result<()> {
        if let Some(stream) = self.stream.lock().as_mut() {
            stream.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "network"
    }
}
