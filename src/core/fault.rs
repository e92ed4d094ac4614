//! Fault isolation for the consumer
//!
//! Nothing that goes wrong while exporting one event may stop the consumer.
//! Exporter errors and panics are turned into [`LoggerError`] values and handed
//! to the resolved [`FaultHandler`]s; handler panics are caught too, and the
//! last line of defence is [`report`], which cannot fail.

use super::error::LoggerError;
use super::log_event::LogEvent;
use super::metrics::PipelineMetrics;
use super::plugins::Capability;
use std::any::Any;
use std::fmt;
use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Best-effort diagnostic line on stderr
///
/// Writes straight to the locked handle without building an intermediate
/// string. Write errors are ignored and a panic raised while formatting
/// `args` is caught, so calling this never fails.
pub fn report(args: fmt::Arguments<'_>) {
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let stderr = std::io::stderr();
        let mut handle = stderr.lock();
        let _ = handle.write_fmt(args);
        let _ = handle.write_all(b"\n");
    }));
}

/// Extract a readable message from a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Receiver of failures the consumer isolates
///
/// Implementations must not panic; if one does anyway the consumer catches it
/// and falls back to [`report`].
pub trait FaultHandler: Send + Sync {
    /// An exporter failed for one event; the event still counts as consumed
    fn handle_event_failure(&self, error: &LoggerError, sequence: u64, event: &LogEvent);

    /// Consumer or exporter startup failed
    fn handle_startup_failure(&self, error: &LoggerError);

    /// Consumer or exporter shutdown failed
    fn handle_shutdown_failure(&self, error: &LoggerError);

    /// An exporter failed to flush after a batch
    fn handle_flush_failure(&self, error: &LoggerError, exporter: &str) {
        report(format_args!(
            "[LOGGER ERROR] Exporter '{}' flush failed: {}",
            exporter, error
        ));
    }

    fn name(&self) -> &str;
}

impl Capability for dyn FaultHandler {
    const NAME: &'static str = "FaultHandler";
    const DEFAULT_IMPLEMENTATION: &'static str = "stderr";
}

/// Default handler writing every failure to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrFaultHandler;

impl StderrFaultHandler {
    pub fn new() -> Self {
        Self
    }
}

impl FaultHandler for StderrFaultHandler {
    fn handle_event_failure(&self, error: &LoggerError, sequence: u64, event: &LogEvent) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            let stderr = std::io::stderr();
            let mut out = stderr.lock();
            let _ = write!(out, "AsyncLogger error handling event seq={}, value='", sequence);

            let rendered = catch_unwind(AssertUnwindSafe(|| write!(out, "{}", event)));
            if let Err(payload) = rendered {
                let _ = write!(
                    out,
                    "ERROR formatting event: {}",
                    panic_message(&*payload)
                );
            }

            let _ = writeln!(out, "': {}", error);
        }));
    }

    fn handle_startup_failure(&self, error: &LoggerError) {
        report(format_args!("AsyncLogger error starting: {}", error));
    }

    fn handle_shutdown_failure(&self, error: &LoggerError) {
        report(format_args!("AsyncLogger error shutting down: {}", error));
    }

    fn name(&self) -> &str {
        "stderr"
    }
}

/// Fan-out over the resolved handlers with panic isolation around each call
pub(crate) struct FaultIsolation {
    handlers: Vec<Arc<dyn FaultHandler>>,
    metrics: Arc<PipelineMetrics>,
}

impl FaultIsolation {
    pub(crate) fn new(handlers: Vec<Arc<dyn FaultHandler>>, metrics: Arc<PipelineMetrics>) -> Self {
        Self { handlers, metrics }
    }

    pub(crate) fn event_failure(&self, error: &LoggerError, sequence: u64, event: &LogEvent) {
        self.metrics.record_export_failure();
        self.dispatch("event", |handler| {
            handler.handle_event_failure(error, sequence, event)
        });
    }

    pub(crate) fn startup_failure(&self, error: &LoggerError) {
        self.dispatch("startup", |handler| handler.handle_startup_failure(error));
    }

    pub(crate) fn shutdown_failure(&self, error: &LoggerError) {
        self.dispatch("shutdown", |handler| handler.handle_shutdown_failure(error));
    }

    pub(crate) fn flush_failure(&self, error: &LoggerError, exporter: &str) {
        self.dispatch("flush", |handler| handler.handle_flush_failure(error, exporter));
    }

    fn dispatch(&self, kind: &str, call: impl Fn(&dyn FaultHandler)) {
        if self.handlers.is_empty() {
            report(format_args!("[LOGGER ERROR] Unhandled {} failure", kind));
            return;
        }

        for handler in &self.handlers {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| call(handler.as_ref()))) {
                report(format_args!(
                    "[LOGGER CRITICAL] Fault handler '{}' panicked while reporting a {} failure: {}",
                    handler.name(),
                    kind,
                    panic_message(&*payload)
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_level::LogLevel;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct PanickingHandler;

    impl FaultHandler for PanickingHandler {
        fn handle_event_failure(&self, _: &LoggerError, _: u64, _: &LogEvent) {
            panic!("handler exploded");
        }
        fn handle_startup_failure(&self, _: &LoggerError) {
            panic!("handler exploded");
        }
        fn handle_shutdown_failure(&self, _: &LoggerError) {}
        fn name(&self) -> &str {
            "panicking"
        }
    }

    #[derive(Default)]
    struct CountingHandler {
        events: AtomicUsize,
    }

    impl FaultHandler for CountingHandler {
        fn handle_event_failure(&self, _: &LoggerError, _: u64, _: &LogEvent) {
            self.events.fetch_add(1, Ordering::Relaxed);
        }
        fn handle_startup_failure(&self, _: &LoggerError) {}
        fn handle_shutdown_failure(&self, _: &LoggerError) {}
        fn name(&self) -> &str {
            "counting"
        }
    }

    #[test]
    fn test_report_never_panics() {
        struct BadDisplay;
        impl fmt::Display for BadDisplay {
            fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
                panic!("display exploded")
            }
        }

        report(format_args!("value: {}", BadDisplay));
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload = catch_unwind(|| panic!("static message")).unwrap_err();
        assert_eq!(panic_message(&*payload), "static message");

        let payload = catch_unwind(|| panic!("formatted {}", 42)).unwrap_err();
        assert_eq!(panic_message(&*payload), "formatted 42");
    }

    #[test]
    fn test_handler_panic_does_not_escape() {
        let counting = Arc::new(CountingHandler::default());
        let isolation = FaultIsolation::new(
            vec![Arc::new(PanickingHandler), Arc::clone(&counting) as Arc<dyn FaultHandler>],
            Arc::new(PipelineMetrics::new()),
        );

        let event = LogEvent::bytes(LogLevel::Info, b"payload");
        let error = LoggerError::export("test", "failed");

        isolation.event_failure(&error, 7, &event);
        isolation.startup_failure(&error);

        assert_eq!(counting.events.load(Ordering::Relaxed), 1);
        assert_eq!(isolation.metrics.export_failures(), 1);
    }

    #[test]
    fn test_stderr_handler_survives_all_calls() {
        let handler = StderrFaultHandler::new();
        let event = LogEvent::bytes(LogLevel::Warn, b"payload");
        let error = LoggerError::export("console", "broken pipe");

        handler.handle_event_failure(&error, 1, &event);
        handler.handle_startup_failure(&LoggerError::lifecycle("startup", "x"));
        handler.handle_shutdown_failure(&LoggerError::lifecycle("shutdown", "y"));
        handler.handle_flush_failure(&error, "console");
    }
}
