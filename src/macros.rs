//! Logging macros for ergonomic log message formatting.
//!
//! These macros provide a convenient interface for logging with automatic
//! string formatting, similar to `println!` and `format!`. They work on both
//! [`AsyncLogger`](crate::AsyncLogger) and [`Producer`](crate::Producer) and
//! evaluate to the `Result<LogOutcome>` of the submission.
//!
//! # Examples
//!
//! ```
//! use rust_async_logger::prelude::*;
//! use rust_async_logger::core::plugins::Plugins;
//! use rust_async_logger::info;
//! use std::sync::Arc;
//!
//! let plugins = Plugins::new(SystemProperties::isolated(), FileProperties::empty());
//! let logger = AsyncLogger::builder().plugins(Arc::new(plugins)).build()?;
//!
//! // Basic logging
//! info!(logger, "Server started")?;
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port)?;
//!
//! // From another thread, through a producer handle
//! let producer = logger.producer();
//! std::thread::spawn(move || info!(producer, "User {} logged in", 42))
//!     .join()
//!     .unwrap()?;
//! # Ok::<(), LoggerError>(())
//! ```

/// Log a message with automatic formatting.
///
/// # Examples
///
/// ```
/// # use rust_async_logger::prelude::*;
/// # use rust_async_logger::core::plugins::Plugins;
/// # use std::sync::Arc;
/// # let plugins = Plugins::new(SystemProperties::isolated(), FileProperties::empty());
/// # let logger = AsyncLogger::builder().plugins(Arc::new(plugins)).build()?;
/// use rust_async_logger::log;
/// log!(logger, LogLevel::Info, "Simple message")?;
/// log!(logger, LogLevel::Error, "Error code: {}", 500)?;
/// # Ok::<(), LoggerError>(())
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log_value($level, &format!($($arg)+))
    };
}

/// Log a trace-level message.
///
/// # Examples
///
/// ```
/// # use rust_async_logger::prelude::*;
/// # use rust_async_logger::core::plugins::Plugins;
/// # use std::sync::Arc;
/// # let plugins = Plugins::new(SystemProperties::isolated(), FileProperties::empty());
/// # let logger = AsyncLogger::builder().plugins(Arc::new(plugins)).build()?;
/// use rust_async_logger::trace;
/// trace!(logger, "Entering function: calculate()")?;
/// trace!(logger, "Variable value: {}", 42)?;
/// # Ok::<(), LoggerError>(())
/// ```
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
///
/// # Examples
///
/// ```
/// # use rust_async_logger::prelude::*;
/// # use rust_async_logger::core::plugins::Plugins;
/// # use std::sync::Arc;
/// # let plugins = Plugins::new(SystemProperties::isolated(), FileProperties::empty());
/// # let logger = AsyncLogger::builder().plugins(Arc::new(plugins)).build()?;
/// use rust_async_logger::debug;
/// debug!(logger, "Debug information")?;
/// debug!(logger, "Counter value: {}", 10)?;
/// # Ok::<(), LoggerError>(())
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// # use rust_async_logger::prelude::*;
/// # use rust_async_logger::core::plugins::Plugins;
/// # use std::sync::Arc;
/// # let plugins = Plugins::new(SystemProperties::isolated(), FileProperties::empty());
/// # let logger = AsyncLogger::builder().plugins(Arc::new(plugins)).build()?;
/// use rust_async_logger::info;
/// info!(logger, "Application started")?;
/// info!(logger, "Processing {} items", 100)?;
/// # Ok::<(), LoggerError>(())
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use rust_async_logger::prelude::*;
/// # use rust_async_logger::core::plugins::Plugins;
/// # use std::sync::Arc;
/// # let plugins = Plugins::new(SystemProperties::isolated(), FileProperties::empty());
/// # let logger = AsyncLogger::builder().plugins(Arc::new(plugins)).build()?;
/// use rust_async_logger::warn;
/// warn!(logger, "Low disk space")?;
/// warn!(logger, "Retry attempt {} of {}", 3, 5)?;
/// # Ok::<(), LoggerError>(())
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
///
/// # Examples
///
/// ```
/// # use rust_async_logger::prelude::*;
/// # use rust_async_logger::core::plugins::Plugins;
/// # use std::sync::Arc;
/// # let plugins = Plugins::new(SystemProperties::isolated(), FileProperties::empty());
/// # let logger = AsyncLogger::builder().plugins(Arc::new(plugins)).build()?;
/// use rust_async_logger::error;
/// error!(logger, "Failed to connect to database")?;
/// error!(logger, "Error code: {}, message: {}", 500, "Internal error")?;
/// # Ok::<(), LoggerError>(())
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a fatal-level message.
///
/// # Examples
///
/// ```
/// # use rust_async_logger::prelude::*;
/// # use rust_async_logger::core::plugins::Plugins;
/// # use std::sync::Arc;
/// # let plugins = Plugins::new(SystemProperties::isolated(), FileProperties::empty());
/// # let logger = AsyncLogger::builder().plugins(Arc::new(plugins)).build()?;
/// use rust_async_logger::fatal;
/// fatal!(logger, "Critical system failure")?;
/// fatal!(logger, "Unable to recover from error: {}", "disk full")?;
/// # Ok::<(), LoggerError>(())
/// ```
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Fatal, $($arg)+)
    };
}
