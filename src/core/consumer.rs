//! The single background consumer
//!
//! One thread drains the ring for the lifetime of the pipeline:
//!
//! ```text
//! Idle ──► Waiting ──► Draining ──► Idle
//!             │
//!             └─ shutdown requested ──► Draining (bounded) ──► Shutdown
//! ```
//!
//! Each ready batch is processed strictly in sequence order. Every event goes
//! to every exporter in registration order; exporter errors and panics are
//! handed to the fault handlers and the event still counts as consumed.
//! The consumed cursor is advanced once per batch, by this thread only.

use super::error::LoggerError;
use super::exporter::Exporter;
use super::fault::{panic_message, report, FaultIsolation};
use super::log_event::LogEvent;
use super::metrics::PipelineMetrics;
use super::ring_buffer::RingBuffer;
use super::sequencer::Sequencer;
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::ops::Range;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Longest single wait before re-checking the shutdown flag
const IDLE_WAIT: Duration = Duration::from_millis(50);

/// Longest single wait for an in-flight claim during the shutdown drain
const DRAIN_WAIT: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConsumerState {
    Idle = 0,
    Waiting = 1,
    Draining = 2,
    Shutdown = 3,
}

impl ConsumerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConsumerState::Idle,
            1 => ConsumerState::Waiting,
            2 => ConsumerState::Draining,
            _ => ConsumerState::Shutdown,
        }
    }
}

/// State shared between the consumer thread and its owner
#[derive(Debug)]
pub(crate) struct ConsumerControl {
    state: AtomicU8,
    shutdown_requested: AtomicBool,
    deadline: Mutex<Option<Instant>>,
}

impl ConsumerControl {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(ConsumerState::Idle as u8),
            shutdown_requested: AtomicBool::new(false),
            deadline: Mutex::new(None),
        }
    }

    pub(crate) fn state(&self) -> ConsumerState {
        ConsumerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ConsumerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Ask the consumer to drain and stop; the first deadline wins
    pub(crate) fn request_shutdown(&self, deadline: Instant) {
        self.deadline.lock().get_or_insert(deadline);
        self.shutdown_requested.store(true, Ordering::Release);
    }

    pub(crate) fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    fn deadline(&self) -> Instant {
        self.deadline.lock().unwrap_or_else(Instant::now)
    }
}

pub(crate) struct ConsumerLoop {
    ring: Arc<RingBuffer<LogEvent>>,
    sequencer: Arc<Sequencer>,
    exporters: Vec<Arc<dyn Exporter>>,
    faults: FaultIsolation,
    control: Arc<ConsumerControl>,
    metrics: Arc<PipelineMetrics>,
}

impl ConsumerLoop {
    pub(crate) fn new(
        ring: Arc<RingBuffer<LogEvent>>,
        sequencer: Arc<Sequencer>,
        exporters: Vec<Arc<dyn Exporter>>,
        faults: FaultIsolation,
        control: Arc<ConsumerControl>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            ring,
            sequencer,
            exporters,
            faults,
            control,
            metrics,
        }
    }

    /// Start the consumer thread; `done` receives a message once it has stopped
    pub(crate) fn spawn(self, done: Sender<()>) -> std::io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("async-logger-consumer".to_string())
            .spawn(move || {
                if let Err(payload) = catch_unwind(AssertUnwindSafe(|| self.run())) {
                    report(format_args!(
                        "[LOGGER CRITICAL] Consumer loop panicked: {}",
                        panic_message(&*payload)
                    ));
                    self.control.set_state(ConsumerState::Shutdown);
                }
                let _ = done.send(());
            })
    }

    pub(crate) fn run(&self) {
        self.start_exporters();

        let mut consumed = self.sequencer.consumed();
        while !self.control.is_shutdown_requested() {
            self.control.set_state(ConsumerState::Waiting);
            let batch = self.sequencer.wait_for_batch(consumed, IDLE_WAIT, || {
                self.control.is_shutdown_requested()
            });

            if !batch.is_empty() {
                self.control.set_state(ConsumerState::Draining);
                consumed = self.drain_batch(batch, None);
            }
            self.control.set_state(ConsumerState::Idle);
        }

        self.drain_on_shutdown(consumed, self.control.deadline());
        self.stop_exporters();
        self.control.set_state(ConsumerState::Shutdown);
    }

    /// Export a ready batch and release its slots, returning the new consumed cursor
    ///
    /// Past `deadline` the remaining events of the batch are counted as
    /// shutdown losses instead of being exported.
    fn drain_batch(&self, batch: Range<u64>, deadline: Option<Instant>) -> u64 {
        let last = batch.end - 1;

        for sequence in batch.clone() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                self.metrics.record_shutdown_dropped(batch.end - sequence);
                break;
            }

            // SAFETY: `sequence` lies in the ready range returned by the
            // sequencer, so it is published, and the slot is not released
            // until `advance_consumed` below.
            let event = unsafe { self.ring.slot(sequence) };
            self.dispatch(sequence, event);
        }

        self.flush_exporters();
        self.sequencer.advance_consumed(last);
        last
    }

    fn dispatch(&self, sequence: u64, event: &LogEvent) {
        let mut failed = false;

        for exporter in &self.exporters {
            let error = match catch_unwind(AssertUnwindSafe(|| exporter.export(event))) {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(payload) => {
                    LoggerError::exporter_panicked(exporter.name(), panic_message(&*payload))
                }
            };

            failed = true;
            self.faults.event_failure(&error, sequence, event);
        }

        if !failed {
            self.metrics.record_exported();
        }
    }

    fn drain_on_shutdown(&self, mut consumed: u64, deadline: Instant) {
        self.control.set_state(ConsumerState::Draining);

        loop {
            let batch = self.sequencer.next_ready_batch(consumed);
            if !batch.is_empty() {
                consumed = self.drain_batch(batch, Some(deadline));
                continue;
            }

            // Read before `claimed`: a producer leaving its claim window has
            // already moved `claimed`, one entering it sees the sequencer closed.
            let claiming = self.sequencer.claims_in_progress() as u64;
            let in_flight = self.sequencer.claimed().saturating_sub(consumed);
            if in_flight == 0 && claiming == 0 {
                break;
            }

            let now = Instant::now();
            if now >= deadline {
                let lost = in_flight + claiming;
                self.metrics.record_abandoned(lost);
                self.faults.shutdown_failure(&LoggerError::lifecycle(
                    "shutdown",
                    format!(
                        "{} claimed events were not published before the drain deadline",
                        lost
                    ),
                ));
                break;
            }

            self.sequencer
                .wait_for_batch(consumed, (deadline - now).min(DRAIN_WAIT), || false);
        }
    }

    fn start_exporters(&self) {
        for exporter in &self.exporters {
            if let Some(e) = isolate(exporter.as_ref(), |ex| ex.start()) {
                self.faults.startup_failure(&LoggerError::lifecycle(
                    "startup",
                    format!("exporter '{}': {}", exporter.name(), e),
                ));
            }
        }
    }

    fn flush_exporters(&self) {
        for exporter in &self.exporters {
            if let Some(e) = isolate(exporter.as_ref(), |ex| ex.flush()) {
                self.faults.flush_failure(&e, exporter.name());
            }
        }
    }

    fn stop_exporters(&self) {
        for exporter in &self.exporters {
            if let Some(e) = isolate(exporter.as_ref(), |ex| ex.shutdown()) {
                self.faults.shutdown_failure(&LoggerError::lifecycle(
                    "shutdown",
                    format!("exporter '{}': {}", exporter.name(), e),
                ));
            }
        }
    }
}

/// Run one exporter call, turning an error or a panic into `Some(error)`
fn isolate(
    exporter: &dyn Exporter,
    call: impl FnOnce(&dyn Exporter) -> super::error::Result<()>,
) -> Option<LoggerError> {
    match catch_unwind(AssertUnwindSafe(|| call(exporter))) {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e),
        Err(payload) => Some(LoggerError::exporter_panicked(
            exporter.name(),
            panic_message(&*payload),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backpressure::BackpressurePolicy;
    use crate::core::error::Result;
    use crate::core::fault::FaultHandler;
    use crate::core::log_event::PayloadSource;
    use crate::core::log_level::LogLevel;
    use crate::core::sequencer::Claim;
    use parking_lot::Mutex as PlMutex;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Recording {
        seen: PlMutex<Vec<u64>>,
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    impl Exporter for Recording {
        fn export(&self, event: &LogEvent) -> Result<()> {
            self.seen.lock().push(event.sequence);
            Ok(())
        }
        fn start(&self) -> Result<()> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn shutdown(&self) -> Result<()> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn name(&self) -> &str {
            "recording"
        }
    }

    struct Panicking;

    impl Exporter for Panicking {
        fn export(&self, _: &LogEvent) -> Result<()> {
            panic!("exporter exploded");
        }
        fn start(&self) -> Result<()> {
            Err(LoggerError::other("cannot start"))
        }
        fn name(&self) -> &str {
            "panicking"
        }
    }

    #[derive(Default)]
    struct Counting {
        events: AtomicUsize,
        startups: AtomicUsize,
        shutdowns: AtomicUsize,
    }

    impl FaultHandler for Counting {
        fn handle_event_failure(&self, _: &LoggerError, _: u64, _: &LogEvent) {
            self.events.fetch_add(1, Ordering::SeqCst);
        }
        fn handle_startup_failure(&self, _: &LoggerError) {
            self.startups.fetch_add(1, Ordering::SeqCst);
        }
        fn handle_shutdown_failure(&self, _: &LoggerError) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
        fn name(&self) -> &str {
            "counting"
        }
    }

    struct Harness {
        ring: Arc<RingBuffer<LogEvent>>,
        sequencer: Arc<Sequencer>,
        control: Arc<ConsumerControl>,
        metrics: Arc<PipelineMetrics>,
    }

    impl Harness {
        fn new(capacity: usize) -> Self {
            let metrics = Arc::new(PipelineMetrics::new());
            Self {
                ring: Arc::new(RingBuffer::new(capacity).unwrap()),
                sequencer: Arc::new(
                    Sequencer::new(capacity, BackpressurePolicy::Block, Arc::clone(&metrics))
                        .unwrap(),
                ),
                control: Arc::new(ConsumerControl::new()),
                metrics,
            }
        }

        fn consumer(
            &self,
            exporters: Vec<Arc<dyn Exporter>>,
            handler: Arc<dyn FaultHandler>,
        ) -> ConsumerLoop {
            ConsumerLoop::new(
                Arc::clone(&self.ring),
                Arc::clone(&self.sequencer),
                exporters,
                FaultIsolation::new(vec![handler], Arc::clone(&self.metrics)),
                Arc::clone(&self.control),
                Arc::clone(&self.metrics),
            )
        }

        fn claim(&self) -> u64 {
            match self.sequencer.claim_next().unwrap() {
                Claim::Claimed(s) => s,
                Claim::Dropped => panic!("unexpected drop"),
            }
        }

        fn write(&self, sequence: u64) {
            unsafe {
                self.ring.slot_mut(sequence).fill(
                    sequence,
                    LogLevel::Info,
                    PayloadSource::Bytes(b"event"),
                );
            }
        }

        fn publish(&self, count: usize) {
            for _ in 0..count {
                let s = self.claim();
                self.write(s);
                self.sequencer.publish(s);
            }
        }
    }

    #[test]
    fn test_drains_in_order_on_shutdown() {
        let harness = Harness::new(16);
        let recording = Arc::new(Recording::default());
        let consumer =
            harness.consumer(vec![recording.clone()], Arc::new(Counting::default()));

        harness.publish(10);
        harness
            .control
            .request_shutdown(Instant::now() + Duration::from_secs(5));
        consumer.run();

        assert_eq!(*recording.seen.lock(), (1..=10).collect::<Vec<_>>());
        assert_eq!(harness.sequencer.consumed(), 10);
        assert_eq!(harness.metrics.exported(), 10);
        assert_eq!(recording.starts.load(Ordering::SeqCst), 1);
        assert_eq!(recording.stops.load(Ordering::SeqCst), 1);
        assert_eq!(harness.control.state(), ConsumerState::Shutdown);
    }

    #[test]
    fn test_panicking_exporter_is_isolated() {
        let harness = Harness::new(8);
        let recording = Arc::new(Recording::default());
        let counting = Arc::new(Counting::default());
        let consumer = harness.consumer(
            vec![Arc::new(Panicking), recording.clone()],
            counting.clone(),
        );

        harness.publish(5);
        harness
            .control
            .request_shutdown(Instant::now() + Duration::from_secs(5));
        consumer.run();

        assert_eq!(recording.seen.lock().len(), 5);
        assert_eq!(counting.events.load(Ordering::SeqCst), 5);
        assert_eq!(counting.startups.load(Ordering::SeqCst), 1);
        assert_eq!(harness.metrics.export_failures(), 5);
        assert_eq!(harness.metrics.exported(), 0);
        assert_eq!(harness.sequencer.consumed(), 5);
    }

    #[test]
    fn test_unpublished_claim_is_abandoned_at_deadline() {
        let harness = Harness::new(8);
        let counting = Arc::new(Counting::default());
        let consumer = harness.consumer(vec![Arc::new(Recording::default())], counting.clone());

        harness.publish(2);
        let _stalled = harness.claim();

        let start = Instant::now();
        harness
            .control
            .request_shutdown(Instant::now() + Duration::from_millis(30));
        consumer.run();

        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(harness.sequencer.consumed(), 2);
        assert_eq!(harness.metrics.abandoned_claims(), 1);
        assert_eq!(counting.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_expired_deadline_counts_published_events_as_dropped() {
        let harness = Harness::new(8);
        let recording = Arc::new(Recording::default());
        let consumer = harness.consumer(vec![recording.clone()], Arc::new(Counting::default()));

        harness.publish(4);
        harness.control.request_shutdown(Instant::now());
        consumer.run();

        assert!(recording.seen.lock().is_empty());
        assert_eq!(harness.metrics.shutdown_dropped(), 4);
        assert_eq!(harness.sequencer.consumed(), 4);
    }

    #[test]
    fn test_claim_landing_after_close_is_still_drained() {
        let harness = Harness::new(8);
        let recording = Arc::new(Recording::default());
        let consumer = harness.consumer(vec![recording.clone()], Arc::new(Counting::default()));

        harness.publish(2);
        // A producer that passed the closed check but has not claimed yet
        let window = harness.sequencer.open_claim_window().unwrap();

        harness.sequencer.close();
        harness
            .control
            .request_shutdown(Instant::now() + Duration::from_secs(5));
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let handle = consumer.spawn(done_tx).unwrap();

        assert!(
            done_rx.recv_timeout(Duration::from_millis(100)).is_err(),
            "drain must wait for the open claim window"
        );

        let sequence = window.claim().unwrap();
        drop(window);
        harness.write(sequence);
        harness.sequencer.publish(sequence);

        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        handle.join().unwrap();
        assert_eq!(*recording.seen.lock(), vec![1, 2, 3]);
        assert_eq!(harness.metrics.abandoned_claims(), 0);
        assert_eq!(harness.metrics.shutdown_dropped(), 0);
    }

    #[test]
    fn test_open_claim_window_at_deadline_is_abandoned() {
        let harness = Harness::new(8);
        let counting = Arc::new(Counting::default());
        let consumer = harness.consumer(vec![Arc::new(Recording::default())], counting.clone());

        harness.publish(1);
        let _window = harness.sequencer.open_claim_window().unwrap();
        harness.sequencer.close();
        harness
            .control
            .request_shutdown(Instant::now() + Duration::from_millis(30));
        consumer.run();

        assert_eq!(harness.sequencer.consumed(), 1);
        assert_eq!(harness.metrics.abandoned_claims(), 1);
        assert_eq!(counting.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_spawned_consumer_signals_completion() {
        let harness = Harness::new(8);
        let recording = Arc::new(Recording::default());
        let consumer = harness.consumer(vec![recording.clone()], Arc::new(Counting::default()));

        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let handle = consumer.spawn(done_tx).unwrap();

        harness.publish(3);
        harness
            .control
            .request_shutdown(Instant::now() + Duration::from_secs(5));
        harness.sequencer.wake_consumer();

        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        handle.join().unwrap();
        assert_eq!(recording.seen.lock().len(), 3);
    }
}
