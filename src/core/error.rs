//! Error types for the logging pipeline

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// A capability was registered after its implementations were already resolved
    #[error("Another {capability} implementation set was already registered")]
    ConfigurationConflict { capability: String },

    /// An explicitly named implementation could not be loaded
    #[error("{capability} implementation '{implementation}' could not be loaded: {message}")]
    ResolutionFailure {
        capability: String,
        implementation: String,
        message: String,
    },

    /// An exporter rejected a single event
    #[error("Exporter '{exporter}' failed: {message}")]
    ExportFailure { exporter: String, message: String },

    /// An exporter panicked while handling a single event
    #[error("Exporter '{exporter}' panicked: {message}")]
    ExporterPanicked { exporter: String, message: String },

    /// Ring buffer full under the fail-immediately policy
    #[error("Ring buffer full: all {capacity} slots are waiting to be consumed")]
    BackpressureOverflow { capacity: usize },

    /// Error while starting or stopping the consumer
    #[error("Consumer {phase} failed: {message}")]
    LifecycleFailure { phase: String, message: String },

    /// Pipeline no longer accepts events
    #[error("Logger already stopped")]
    LoggerStopped,

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create a configuration conflict error for a capability
    pub fn conflict(capability: impl Into<String>) -> Self {
        LoggerError::ConfigurationConflict {
            capability: capability.into(),
        }
    }

    /// Create a resolution failure for an explicitly named implementation
    pub fn resolution(
        capability: impl Into<String>,
        implementation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        LoggerError::ResolutionFailure {
            capability: capability.into(),
            implementation: implementation.into(),
            message: message.into(),
        }
    }

    /// Create an export failure
    pub fn export(exporter: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::ExportFailure {
            exporter: exporter.into(),
            message: message.into(),
        }
    }

    /// Create an exporter panic error
    pub fn exporter_panicked(exporter: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::ExporterPanicked {
            exporter: exporter.into(),
            message: message.into(),
        }
    }

    /// Create a backpressure overflow error
    pub fn overflow(capacity: usize) -> Self {
        LoggerError::BackpressureOverflow { capacity }
    }

    /// Create a lifecycle failure for the given phase ("startup", "shutdown", ...)
    pub fn lifecycle(phase: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::LifecycleFailure {
            phase: phase.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Whether this error must stop pipeline construction
    ///
    /// Only resolution-time misconfiguration is fatal; everything else is
    /// reported and isolated by the consumer.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LoggerError::ConfigurationConflict { .. }
                | LoggerError::ResolutionFailure { .. }
                | LoggerError::InvalidConfiguration { .. }
        )
    }
}
