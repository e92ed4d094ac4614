//! Pipeline settings and the property keys they are read from

use super::backpressure::BackpressurePolicy;
use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use super::properties::PropertySource;
use std::str::FromStr;
use std::time::Duration;

/// Property keys understood by the pipeline
pub mod keys {
    /// Path of the JSON configuration file
    pub const CONFIG_FILE: &str = "asynclogger.config.file";
    /// Ring capacity, rounded up to a power of two
    pub const BUFFER_SIZE: &str = "asynclogger.buffer.size";
    /// `block`, `drop`, `fail` or `block:<millis>`
    pub const BACKPRESSURE: &str = "asynclogger.backpressure";
    /// Drain deadline applied on shutdown
    pub const SHUTDOWN_TIMEOUT_MS: &str = "asynclogger.shutdown.timeout.ms";
    /// Minimum level accepted by producers
    pub const LEVEL: &str = "asynclogger.level";

    pub const FILE_EXPORTER_PATH: &str = "asynclogger.exporter.file.path";
    pub const JSON_EXPORTER_PATH: &str = "asynclogger.exporter.json.path";
    pub const NETWORK_EXPORTER_ADDRESS: &str = "asynclogger.exporter.network.address";
    pub const ASYNC_FILE_EXPORTER_PATH: &str = "asynclogger.exporter.async_file.path";
}

/// Default ring capacity
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Default shutdown drain deadline (5 seconds)
///
/// This timeout is used when the logger is dropped without explicit shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for one pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub capacity: usize,
    pub backpressure: BackpressurePolicy,
    pub shutdown_timeout: Duration,
    pub min_level: LogLevel,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_BUFFER_SIZE,
            backpressure: BackpressurePolicy::default(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            min_level: LogLevel::Trace,
        }
    }
}

impl PipelineConfig {
    /// Read settings from `properties`, keeping defaults for absent keys
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` if a present value cannot be parsed.
    pub fn from_properties(properties: &dyn PropertySource) -> Result<Self> {
        let defaults = Self::default();

        let capacity = parse_key::<usize>(properties, keys::BUFFER_SIZE)?
            .unwrap_or(defaults.capacity);
        let backpressure = parse_key::<BackpressurePolicy>(properties, keys::BACKPRESSURE)?
            .unwrap_or(defaults.backpressure);
        let shutdown_timeout = parse_key::<u64>(properties, keys::SHUTDOWN_TIMEOUT_MS)?
            .map(Duration::from_millis)
            .unwrap_or(defaults.shutdown_timeout);
        let min_level =
            parse_key::<LogLevel>(properties, keys::LEVEL)?.unwrap_or(defaults.min_level);

        Ok(Self {
            capacity,
            backpressure,
            shutdown_timeout,
            min_level,
        })
    }

    /// Ring capacity actually allocated: the next power of two
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` for a zero capacity or one that overflows.
    pub fn ring_capacity(&self) -> Result<usize> {
        if self.capacity == 0 {
            return Err(LoggerError::config(keys::BUFFER_SIZE, "must be greater than zero"));
        }
        self.capacity.checked_next_power_of_two().ok_or_else(|| {
            LoggerError::config(keys::BUFFER_SIZE, format!("{} is too large", self.capacity))
        })
    }
}

fn parse_key<T>(properties: &dyn PropertySource, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match properties.get_string(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| LoggerError::config(key, format!("'{}': {}", raw, e))),
    }
}
