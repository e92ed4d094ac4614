//! # Rust Async Logger
//!
//! An asynchronous logging pipeline: application threads publish events into
//! a pre-allocated ring buffer and a single background consumer exports them,
//! strictly in publish order, to pluggable exporters.
//!
//! ## Features
//!
//! - **Ordered delivery**: events reach exporters in sequence order, each at most once
//! - **Bounded memory**: slots are allocated once and reused in place
//! - **Backpressure**: block, block with timeout, drop-and-count or fail when full
//! - **Fault isolation**: a failing or panicking exporter never stops the consumer
//! - **Pluggable exporters**: resolved once from system properties, a config
//!   file, registered service providers or the built-in console exporter
//!
//! ## Example
//!
//! ```
//! use rust_async_logger::prelude::*;
//! use rust_async_logger::core::plugins::Plugins;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let plugins = Plugins::new(SystemProperties::isolated(), FileProperties::empty());
//! let mut logger = AsyncLogger::builder()
//!     .plugins(Arc::new(plugins))
//!     .capacity(1024)
//!     .backpressure(BackpressurePolicy::Block)
//!     .build()?;
//!
//! logger.info("ready")?;
//! logger.log_value(LogLevel::Warn, &serde_json::json!({"disk_free_mb": 120}))?;
//! logger.log_bytes(LogLevel::Debug, b"raw frame")?;
//!
//! assert!(logger.shutdown(Duration::from_secs(1)));
//! # Ok::<(), LoggerError>(())
//! ```

pub mod core;
pub mod exporters;
pub mod macros;

pub mod prelude {
    pub use crate::core::{
        AsyncLogger, BackpressurePolicy, Exporter, FaultHandler, FileProperties, LogEvent,
        LogLevel, LogOutcome, Logger, LoggerBuilder, LoggerError, Payload, PipelineConfig,
        PipelineMetrics, Producer, PropertySource, Result, SystemProperties,
        DEFAULT_SHUTDOWN_TIMEOUT,
    };
    pub use crate::exporters::{ConsoleExporter, JsonExporter};
    #[cfg(feature = "file")]
    pub use crate::exporters::FileExporter;
}

pub use crate::core::{
    AsyncLogger, BackpressurePolicy, ConsumerState, Exporter, FaultHandler,
    FileProperties, LogEvent, LogLevel, LogOutcome, Logger, LoggerBuilder, LoggerError,
    OverflowCallback, Payload, PipelineConfig, PipelineMetrics, Plugins, Producer,
    PropertySource, ResolutionSource, Result, SequencerView, StderrFaultHandler, SystemProperties,
    DEFAULT_BUFFER_SIZE, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use crate::exporters::{ConsoleExporter, JsonExporter, NetworkExporter};
#[cfg(feature = "file")]
pub use crate::exporters::FileExporter;
