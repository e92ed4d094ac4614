//! Core pipeline types and traits

pub mod backpressure;
pub mod config;
pub mod consumer;
pub mod error;
pub mod exporter;
pub mod fault;
pub mod log_event;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod plugins;
pub mod producer;
pub mod properties;
pub(crate) mod ring_buffer;
pub(crate) mod sequencer;
pub mod wait_strategy;

pub use backpressure::{BackpressurePolicy, OverflowCallback};
pub use config::{PipelineConfig, DEFAULT_BUFFER_SIZE, DEFAULT_SHUTDOWN_TIMEOUT};
pub use consumer::ConsumerState;
pub use error::{LoggerError, Result};
pub use exporter::Exporter;
pub use fault::{FaultHandler, StderrFaultHandler};
pub use log_event::{LogEvent, Payload};
pub use log_level::LogLevel;
pub use logger::{AsyncLogger, Logger, LoggerBuilder};
pub use metrics::PipelineMetrics;
pub use plugins::{Catalog, Plugins, ResolutionSource};
pub use producer::{LogOutcome, Producer};
pub use properties::{FileProperties, PropertySource, SystemProperties};
pub use sequencer::SequencerView;
