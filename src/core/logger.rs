//! Pipeline root: wiring, lifecycle and the application-facing API

use super::{
    backpressure::{BackpressurePolicy, OverflowCallback},
    config::PipelineConfig,
    consumer::{ConsumerControl, ConsumerLoop, ConsumerState},
    error::{LoggerError, Result},
    exporter::Exporter,
    fault::{report, FaultHandler, FaultIsolation},
    log_event::LogEvent,
    log_level::LogLevel,
    metrics::PipelineMetrics,
    plugins::Plugins,
    producer::{LogOutcome, Producer},
    ring_buffer::RingBuffer,
    sequencer::{Sequencer, SequencerView},
};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Extra time granted past the drain deadline for an export call in progress
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Application-facing logging surface
///
/// Both entry points log at [`LogLevel::Info`] and succeed when the event was
/// published, dropped by policy or filtered; they fail only when the
/// pipeline refuses the event.
pub trait Logger {
    /// Log a typed value, serialized to JSON before it enters the ring
    fn log_message<E: Serialize + ?Sized>(&self, message: &E) -> Result<()>;

    /// Log an opaque byte payload
    fn log_raw(&self, bytes: &[u8]) -> Result<()>;
}

impl Logger for Producer {
    fn log_message<E: Serialize + ?Sized>(&self, message: &E) -> Result<()> {
        self.log_value(LogLevel::Info, message).map(|_| ())
    }

    fn log_raw(&self, bytes: &[u8]) -> Result<()> {
        self.log_bytes(LogLevel::Info, bytes).map(|_| ())
    }
}

/// Asynchronous logging pipeline
///
/// Owns the ring, the sequencer and the single consumer thread. Producers
/// obtained through [`producer`](Self::producer) stay usable from any thread
/// until [`shutdown`](Self::shutdown) begins; after that every call returns
/// [`LoggerError::LoggerStopped`].
///
/// # Example
///
/// ```
/// use rust_async_logger::prelude::*;
/// use rust_async_logger::core::plugins::Plugins;
/// use rust_async_logger::core::properties::{FileProperties, SystemProperties};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let plugins = Plugins::new(SystemProperties::isolated(), FileProperties::empty());
/// let mut logger = AsyncLogger::builder()
///     .plugins(Arc::new(plugins))
///     .capacity(64)
///     .build()
///     .unwrap();
///
/// logger.info("service started").unwrap();
/// assert!(logger.shutdown(Duration::from_secs(1)));
/// assert_eq!(logger.metrics().published(), 1);
/// ```
pub struct AsyncLogger {
    producer: Producer,
    sequencer: Arc<Sequencer>,
    metrics: Arc<PipelineMetrics>,
    control: Arc<ConsumerControl>,
    plugins: Arc<Plugins>,
    consumer: Option<thread::JoinHandle<()>>,
    done: Receiver<()>,
    shutdown_timeout: Duration,
}

impl AsyncLogger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Pipeline configured entirely from the environment and its config file
    ///
    /// # Errors
    ///
    /// Any configuration, resolution or startup error.
    pub fn from_environment() -> Result<Self> {
        let plugins = Plugins::from_environment()?;
        let config = PipelineConfig::from_properties(&plugins.properties())?;
        LoggerBuilder::from_config(config)
            .plugins(Arc::new(plugins))
            .build()
    }

    /// A new handle for application threads
    pub fn producer(&self) -> Producer {
        self.producer.clone()
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) -> Result<LogOutcome> {
        self.producer.log_value(level, &message.into())
    }

    pub fn log_value<T: Serialize + ?Sized>(&self, level: LogLevel, value: &T) -> Result<LogOutcome> {
        self.producer.log_value(level, value)
    }

    pub fn log_bytes(&self, level: LogLevel, bytes: &[u8]) -> Result<LogOutcome> {
        self.producer.log_bytes(level, bytes)
    }

    pub fn log_event(&self, event: LogEvent) -> Result<LogOutcome> {
        self.producer.log(event)
    }

    pub fn trace(&self, message: impl Into<String>) -> Result<LogOutcome> {
        self.log(LogLevel::Trace, message)
    }

    pub fn debug(&self, message: impl Into<String>) -> Result<LogOutcome> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: impl Into<String>) -> Result<LogOutcome> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: impl Into<String>) -> Result<LogOutcome> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: impl Into<String>) -> Result<LogOutcome> {
        self.log(LogLevel::Error, message)
    }

    pub fn fatal(&self, message: impl Into<String>) -> Result<LogOutcome> {
        self.log(LogLevel::Fatal, message)
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Read-only cursors of the ring
    pub fn sequencer(&self) -> SequencerView<'_> {
        SequencerView::new(&self.sequencer)
    }

    pub fn plugins(&self) -> &Arc<Plugins> {
        &self.plugins
    }

    pub fn policy(&self) -> BackpressurePolicy {
        self.sequencer.policy()
    }

    pub fn capacity(&self) -> usize {
        self.sequencer.capacity()
    }

    pub fn consumer_state(&self) -> ConsumerState {
        self.control.state()
    }

    pub fn is_running(&self) -> bool {
        self.consumer.is_some()
    }

    /// Wait until everything claimed so far has been consumed
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.sequencer.consumed() >= self.sequencer.claimed() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Stop accepting events, drain what was published and stop the consumer
    ///
    /// New claims fail with `LoggerStopped` immediately, producers blocked on
    /// a full ring are released with the same error. Published events are
    /// exported until `timeout` elapses; anything left after that is counted
    /// in [`PipelineMetrics::shutdown_dropped`] or
    /// [`PipelineMetrics::abandoned_claims`].
    ///
    /// Returns `true` if the consumer stopped and nothing was lost. Calling it
    /// again after a completed shutdown returns `true` without doing anything.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        let Some(handle) = self.consumer.take() else {
            return true;
        };

        self.sequencer.close();
        self.control.request_shutdown(Instant::now() + timeout);
        self.sequencer.wake_consumer();

        match self.done.recv_timeout(timeout + SHUTDOWN_GRACE) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Err(e) = handle.join() {
                    report(format_args!(
                        "[LOGGER ERROR] Consumer thread panicked during shutdown: {:?}",
                        e
                    ));
                    return false;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                report(format_args!(
                    "[LOGGER WARNING] Consumer thread did not finish within {:?} timeout. \
                     Some logs may be lost.",
                    timeout
                ));
                return false;
            }
        }

        let lost = self.metrics.shutdown_dropped() + self.metrics.abandoned_claims();
        if lost > 0 {
            report(format_args!(
                "[LOGGER WARNING] {} events were not exported before the drain deadline",
                lost
            ));
        }
        lost == 0
    }
}

impl Logger for AsyncLogger {
    fn log_message<E: Serialize + ?Sized>(&self, message: &E) -> Result<()> {
        self.producer.log_message(message)
    }

    fn log_raw(&self, bytes: &[u8]) -> Result<()> {
        self.producer.log_raw(bytes)
    }
}

impl Drop for AsyncLogger {
    fn drop(&mut self) {
        if self.consumer.is_some() {
            self.shutdown(self.shutdown_timeout);
        }

        let dropped = self.metrics.dropped_count();
        if dropped > 0 {
            report(format_args!(
                "[LOGGER WARNING] Logger shutting down with {} dropped events (drop rate: {:.2}%)",
                dropped,
                self.metrics.drop_rate()
            ));
        }
    }
}

/// Builder for [`AsyncLogger`]
///
/// Exporters and fault handlers given here are registered with the plugin
/// registry, replacing resolution for that capability. Without them, the
/// registry resolves its own.
pub struct LoggerBuilder {
    config: PipelineConfig,
    plugins: Option<Arc<Plugins>>,
    exporters: Vec<Arc<dyn Exporter>>,
    fault_handlers: Vec<Arc<dyn FaultHandler>>,
    on_overflow: Option<OverflowCallback>,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::from_config(PipelineConfig::default())
    }

    pub fn from_config(config: PipelineConfig) -> Self {
        Self {
            config,
            plugins: None,
            exporters: Vec::new(),
            fault_handlers: Vec::new(),
            on_overflow: None,
        }
    }

    /// Ring capacity; rounded up to the next power of two
    #[must_use = "builder methods return a new value"]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Policy applied when the ring is full
    ///
    /// # Example
    ///
    /// ```
    /// use rust_async_logger::prelude::*;
    /// use std::time::Duration;
    ///
    /// let builder = AsyncLogger::builder()
    ///     .capacity(128)
    ///     .backpressure(BackpressurePolicy::BlockWithTimeout(Duration::from_millis(50)));
    /// ```
    #[must_use = "builder methods return a new value"]
    pub fn backpressure(mut self, policy: BackpressurePolicy) -> Self {
        self.config.backpressure = policy;
        self
    }

    /// Drain deadline used when the logger is dropped
    #[must_use = "builder methods return a new value"]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.config.min_level = level;
        self
    }

    /// Use this registry instead of one built from the environment
    #[must_use = "builder methods return a new value"]
    pub fn plugins(mut self, plugins: Arc<Plugins>) -> Self {
        self.plugins = Some(plugins);
        self
    }

    /// Add an exporter
    #[must_use = "builder methods return a new value"]
    pub fn exporter<E: Exporter + 'static>(self, exporter: E) -> Self {
        self.shared_exporter(Arc::new(exporter))
    }

    /// Add an exporter the caller keeps a handle to
    #[must_use = "builder methods return a new value"]
    pub fn shared_exporter(mut self, exporter: Arc<dyn Exporter>) -> Self {
        self.exporters.push(exporter);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn fault_handler(mut self, handler: Arc<dyn FaultHandler>) -> Self {
        self.fault_handlers.push(handler);
        self
    }

    /// Set a callback for drop notifications
    ///
    /// The callback receives the total drop count on the first drop and
    /// every 1000th drop after it.
    #[must_use = "builder methods return a new value"]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    /// Resolve plugins, allocate the ring and start the consumer
    ///
    /// # Errors
    ///
    /// - `ConfigurationConflict` if exporters or fault handlers were given
    ///   but the registry already resolved that capability
    /// - `ResolutionFailure` for an unloadable override
    /// - `InvalidConfiguration` for a zero capacity
    /// - `LifecycleFailure` if the consumer thread cannot be spawned
    pub fn build(self) -> Result<AsyncLogger> {
        let plugins = match self.plugins {
            Some(plugins) => plugins,
            None => Arc::new(Plugins::from_environment()?),
        };

        if !self.exporters.is_empty() {
            plugins.register_exporters(self.exporters)?;
        }
        if !self.fault_handlers.is_empty() {
            plugins.register_fault_handlers(self.fault_handlers)?;
        }
        let exporters = plugins.exporters()?.to_vec();
        let handlers = plugins.fault_handlers()?.to_vec();

        let capacity = self.config.ring_capacity()?;
        let metrics = Arc::new(PipelineMetrics::new());
        let ring = Arc::new(RingBuffer::new(capacity)?);
        let sequencer = Arc::new(
            Sequencer::new(capacity, self.config.backpressure, Arc::clone(&metrics))?
                .with_overflow_callback(self.on_overflow),
        );
        let control = Arc::new(ConsumerControl::new());

        let (done_tx, done_rx) = bounded(1);
        let consumer = ConsumerLoop::new(
            Arc::clone(&ring),
            Arc::clone(&sequencer),
            exporters,
            FaultIsolation::new(handlers, Arc::clone(&metrics)),
            Arc::clone(&control),
            Arc::clone(&metrics),
        )
        .spawn(done_tx)
        .map_err(|e| {
            LoggerError::lifecycle("startup", format!("cannot spawn consumer thread: {}", e))
        })?;

        Ok(AsyncLogger {
            producer: Producer::new(ring, Arc::clone(&sequencer), self.config.min_level),
            sequencer,
            metrics,
            control,
            plugins,
            consumer: Some(consumer),
            done: done_rx,
            shutdown_timeout: self.config.shutdown_timeout,
        })
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::properties::{FileProperties, SystemProperties};
    use crate::core::sequencer::Claim;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Collecting {
        messages: Mutex<Vec<String>>,
    }

    impl Exporter for Collecting {
        fn export(&self, event: &LogEvent) -> Result<()> {
            self.messages.lock().push(event.payload.as_text().into_owned());
            Ok(())
        }

        fn name(&self) -> &str {
            "collecting"
        }
    }

    #[derive(Default)]
    struct Silent {
        failures: AtomicUsize,
    }

    impl FaultHandler for Silent {
        fn handle_event_failure(&self, _: &LoggerError, _: u64, _: &LogEvent) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
        fn handle_startup_failure(&self, _: &LoggerError) {}
        fn handle_shutdown_failure(&self, _: &LoggerError) {}
        fn name(&self) -> &str {
            "silent"
        }
    }

    fn isolated_plugins() -> Arc<Plugins> {
        Arc::new(Plugins::new(
            SystemProperties::isolated(),
            FileProperties::empty(),
        ))
    }

    #[test]
    fn test_logs_reach_exporter_in_order() {
        let exporter = Arc::new(Collecting::default());
        let mut logger = AsyncLogger::builder()
            .plugins(isolated_plugins())
            .shared_exporter(exporter.clone())
            .capacity(16)
            .build()
            .unwrap();

        for i in 0..20 {
            logger.info(format!("message {}", i)).unwrap();
        }
        assert!(logger.shutdown(Duration::from_secs(5)));

        let messages = exporter.messages.lock();
        assert_eq!(messages.len(), 20);
        assert_eq!(messages[0], "message 0");
        assert_eq!(messages[19], "message 19");
        assert_eq!(logger.consumer_state(), ConsumerState::Shutdown);
    }

    #[test]
    fn test_capacity_rounded_to_power_of_two() {
        let logger = AsyncLogger::builder()
            .plugins(isolated_plugins())
            .exporter(Collecting::default())
            .capacity(100)
            .build()
            .unwrap();
        assert_eq!(logger.capacity(), 128);
    }

    #[test]
    fn test_log_after_shutdown_is_stopped() {
        let mut logger = AsyncLogger::builder()
            .plugins(isolated_plugins())
            .exporter(Collecting::default())
            .build()
            .unwrap();

        assert!(logger.shutdown(Duration::from_secs(1)));
        assert!(!logger.is_running());
        assert!(matches!(logger.info("late"), Err(LoggerError::LoggerStopped)));
        assert!(logger.shutdown(Duration::from_secs(1)));
    }

    #[test]
    fn test_min_level_filters() {
        let exporter = Arc::new(Collecting::default());
        let mut logger = AsyncLogger::builder()
            .plugins(isolated_plugins())
            .shared_exporter(exporter.clone())
            .min_level(LogLevel::Warn)
            .build()
            .unwrap();

        assert_eq!(logger.debug("hidden").unwrap(), LogOutcome::Filtered);
        assert!(logger.error("shown").unwrap().is_published());
        logger.shutdown(Duration::from_secs(1));

        assert_eq!(*exporter.messages.lock(), vec!["shown".to_string()]);
    }

    #[test]
    fn test_builder_registration_conflicts_with_resolved_registry() {
        let plugins = isolated_plugins();
        plugins.exporters().unwrap();

        let result = AsyncLogger::builder()
            .plugins(plugins)
            .exporter(Collecting::default())
            .build();
        assert!(matches!(
            result,
            Err(LoggerError::ConfigurationConflict { .. })
        ));
    }

    #[test]
    fn test_facade_logs_typed_and_raw() {
        let exporter = Arc::new(Collecting::default());
        let mut logger = AsyncLogger::builder()
            .plugins(isolated_plugins())
            .shared_exporter(exporter.clone())
            .build()
            .unwrap();

        logger.log_message(&serde_json::json!({"user": 7})).unwrap();
        logger.log_raw(b"raw bytes").unwrap();
        logger.producer().log_message("from producer").unwrap();
        logger.shutdown(Duration::from_secs(1));

        assert_eq!(
            *exporter.messages.lock(),
            vec![
                r#"{"user":7}"#.to_string(),
                "raw bytes".to_string(),
                "from producer".to_string()
            ]
        );
    }

    #[test]
    fn test_custom_fault_handler_receives_failures() {
        struct Failing;
        impl Exporter for Failing {
            fn export(&self, _: &LogEvent) -> Result<()> {
                Err(LoggerError::export("failing", "always"))
            }
            fn name(&self) -> &str {
                "failing"
            }
        }

        let handler = Arc::new(Silent::default());
        let mut logger = AsyncLogger::builder()
            .plugins(isolated_plugins())
            .exporter(Failing)
            .fault_handler(handler.clone())
            .build()
            .unwrap();

        for _ in 0..10 {
            logger.info("x").unwrap();
        }
        assert!(logger.shutdown(Duration::from_secs(5)));
        assert_eq!(handler.failures.load(Ordering::SeqCst), 10);
        assert_eq!(logger.sequencer().consumed(), 10);
    }

    #[test]
    fn test_stalled_claim_bounds_shutdown() {
        let exporter = Arc::new(Collecting::default());
        let handler = Arc::new(Silent::default());
        let mut logger = AsyncLogger::builder()
            .plugins(isolated_plugins())
            .shared_exporter(exporter.clone())
            .fault_handler(handler)
            .build()
            .unwrap();

        logger.info("before the stall").unwrap();
        // A producer that claimed a slot and never published it
        let stalled = logger.sequencer.claim_next().unwrap();
        assert_eq!(stalled, Claim::Claimed(2));

        let start = Instant::now();
        assert!(!logger.shutdown(Duration::from_millis(100)));
        assert!(start.elapsed() < Duration::from_secs(2));

        assert_eq!(*exporter.messages.lock(), vec!["before the stall".to_string()]);
        assert_eq!(logger.metrics().abandoned_claims(), 1);
    }

    #[test]
    fn test_wait_for_drain() {
        let logger = AsyncLogger::builder()
            .plugins(isolated_plugins())
            .exporter(Collecting::default())
            .build()
            .unwrap();

        for i in 0..50 {
            logger.info(format!("{}", i)).unwrap();
        }
        assert!(logger.wait_for_drain(Duration::from_secs(5)));
        assert_eq!(logger.metrics().exported(), 50);
    }
}
