//! Multi-producer, single-consumer sequencer
//!
//! Sequences start at 1; a consumed cursor of 0 means nothing has been
//! consumed yet. Three pieces of shared state drive the protocol:
//!
//! - `claimed`: the highest sequence handed to a producer. Claims are a CAS on
//!   this counter and only succeed while `next - consumed <= capacity`, so a
//!   producer never owns a slot the consumer might still be reading.
//! - `available[i]`: the sequence last published into slot `i`. A producer
//!   publishes `seq` by storing it here with `Release` after writing the slot;
//!   the consumer treats `seq` as ready only when it loads exactly `seq` with
//!   `Acquire`, which makes the slot write visible first.
//! - `consumed`: written only by the consumer, after it finished a batch.
//! - `claiming`: producers between their closed check and their claim CAS.
//!   The shutdown drain only finishes once this is zero, so a claim can not
//!   land after the drain took its final look at `claimed`.
//!
//! Only the read side is public, through [`SequencerView`]; moving the
//! cursors is reserved to the producer and consumer of this crate.
//!
//! A claimed but unpublished sequence is a hole: [`Sequencer::next_ready_batch`]
//! stops in front of it, so consumer-visible order is sequence order.

use super::backpressure::{BackpressurePolicy, OverflowCallback};
use super::error::{LoggerError, Result};
use super::fault::report;
use super::metrics::PipelineMetrics;
use super::wait_strategy::WaitStrategy;
use crossbeam_utils::CachePadded;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Upper bound for a single park while waiting on the other side of the ring
const PARK_INTERVAL: Duration = Duration::from_millis(10);

/// Emit a drop warning on the first drop and every Nth drop after it
const DROP_ALERT_INTERVAL: u64 = 1000;

/// Outcome of a claim attempt that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The caller now exclusively owns the slot for this sequence
    Claimed(u64),
    /// The ring was full and the policy discarded the event
    Dropped,
}

pub struct Sequencer {
    capacity: u64,
    mask: u64,
    claimed: CachePadded<AtomicU64>,
    consumed: CachePadded<AtomicU64>,
    claiming: CachePadded<AtomicUsize>,
    available: Box<[AtomicU64]>,
    policy: BackpressurePolicy,
    closed: AtomicBool,
    producer_wait: WaitStrategy,
    consumer_wait: WaitStrategy,
    metrics: Arc<PipelineMetrics>,
    on_overflow: Option<OverflowCallback>,
}

impl Sequencer {
    /// Create a sequencer for a ring of `capacity` slots
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if `capacity` is zero or not a power of two.
    pub fn new(
        capacity: usize,
        policy: BackpressurePolicy,
        metrics: Arc<PipelineMetrics>,
    ) -> Result<Self> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(LoggerError::config(
                "Sequencer",
                format!("capacity must be a non-zero power of two, got {}", capacity),
            ));
        }

        let available = (0..capacity)
            .map(|_| AtomicU64::new(0))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            capacity: capacity as u64,
            mask: capacity as u64 - 1,
            claimed: CachePadded::new(AtomicU64::new(0)),
            consumed: CachePadded::new(AtomicU64::new(0)),
            claiming: CachePadded::new(AtomicUsize::new(0)),
            available,
            policy,
            closed: AtomicBool::new(false),
            producer_wait: WaitStrategy::new(),
            consumer_wait: WaitStrategy::new(),
            metrics,
            on_overflow: None,
        })
    }

    /// Set a callback invoked alongside drop warnings
    #[must_use]
    pub(crate) fn with_overflow_callback(mut self, callback: Option<OverflowCallback>) -> Self {
        self.on_overflow = callback;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    pub fn policy(&self) -> BackpressurePolicy {
        self.policy
    }

    /// Highest sequence handed to a producer
    pub fn claimed(&self) -> u64 {
        self.claimed.load(Ordering::Acquire)
    }

    /// Highest sequence fully processed by the consumer
    pub fn consumed(&self) -> u64 {
        self.consumed.load(Ordering::Acquire)
    }

    /// Highest sequence such that it and everything before it is published
    pub fn published(&self) -> u64 {
        self.next_ready_batch(self.consumed()).end - 1
    }

    /// Free slots as seen right now
    pub fn remaining_capacity(&self) -> usize {
        let in_flight = self.claimed().saturating_sub(self.consumed());
        self.capacity.saturating_sub(in_flight) as usize
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Producers inside a claim window, i.e. between registering and finishing their CAS
    pub(crate) fn claims_in_progress(&self) -> usize {
        self.claiming.load(Ordering::SeqCst)
    }

    /// Reserve the next sequence, applying the backpressure policy when full
    ///
    /// # Errors
    ///
    /// - `LoggerStopped` once [`close`](Self::close) was called
    /// - `BackpressureOverflow` when full under [`BackpressurePolicy::Fail`]
    pub(crate) fn claim_next(&self) -> Result<Claim> {
        if let Some(sequence) = self.try_claim()? {
            return Ok(Claim::Claimed(sequence));
        }

        self.metrics.record_queue_full();

        match self.policy {
            BackpressurePolicy::Block => self.claim_blocking(None),
            BackpressurePolicy::BlockWithTimeout(timeout) => {
                self.claim_blocking(Some(Instant::now() + timeout))
            }
            BackpressurePolicy::Drop => Ok(self.drop_event()),
            BackpressurePolicy::Fail => {
                self.metrics.record_rejected();
                Err(LoggerError::overflow(self.capacity()))
            }
        }
    }

    /// Single lock-free claim attempt; `None` when the ring is full
    fn try_claim(&self) -> Result<Option<u64>> {
        Ok(self.open_claim_window()?.claim())
    }

    /// Register as claiming, then check that the sequencer is still open
    ///
    /// The registration comes first: once `close` is visible to the drain,
    /// every producer either sees it here or is counted in `claiming`.
    pub(crate) fn open_claim_window(&self) -> Result<ClaimWindow<'_>> {
        self.claiming.fetch_add(1, Ordering::SeqCst);
        let window = ClaimWindow { sequencer: self };
        if self.is_closed() {
            return Err(LoggerError::LoggerStopped);
        }
        Ok(window)
    }

    fn claim_blocking(&self, deadline: Option<Instant>) -> Result<Claim> {
        self.metrics.record_block();

        loop {
            if let Some(sequence) = self.try_claim()? {
                return Ok(Claim::Claimed(sequence));
            }

            let park = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(self.drop_event());
                    }
                    (deadline - now).min(PARK_INTERVAL)
                }
                None => PARK_INTERVAL,
            };

            self.producer_wait
                .wait_for(park, || self.has_capacity() || self.is_closed());
        }
    }

    fn has_capacity(&self) -> bool {
        let claimed = self.claimed.load(Ordering::Acquire);
        (claimed + 1).saturating_sub(self.consumed.load(Ordering::Acquire)) <= self.capacity
    }

    fn drop_event(&self) -> Claim {
        let previous = self.metrics.record_dropped();
        let total = previous + 1;

        if previous == 0 || total % DROP_ALERT_INTERVAL == 0 {
            report(format_args!(
                "[LOGGER WARNING] Ring buffer full, {} events dropped. \
                 Consider a larger buffer or a blocking backpressure policy.",
                total
            ));

            if let Some(ref callback) = self.on_overflow {
                callback(total);
            }
        }

        Claim::Dropped
    }

    /// Make a claimed, fully written sequence visible to the consumer
    ///
    /// The `Release` store pairs with the consumer's `Acquire` load in
    /// [`is_available`](Self::is_available): the slot write happens-before
    /// any read of the slot by the consumer.
    pub(crate) fn publish(&self, sequence: u64) {
        debug_assert!(sequence >= 1 && sequence <= self.claimed());
        self.available[(sequence & self.mask) as usize].store(sequence, Ordering::Release);
        self.metrics.record_published();
        self.consumer_wait.signal();
    }

    #[inline]
    fn is_available(&self, sequence: u64) -> bool {
        self.available[(sequence & self.mask) as usize].load(Ordering::Acquire) == sequence
    }

    /// Maximal contiguous range of published sequences after `from_consumed`
    ///
    /// The range is empty when the next sequence is not published yet.
    pub(crate) fn next_ready_batch(&self, from_consumed: u64) -> Range<u64> {
        let start = from_consumed + 1;
        let claimed = self.claimed.load(Ordering::Acquire);

        let mut end = start;
        while end <= claimed && self.is_available(end) {
            end += 1;
        }

        start..end
    }

    /// Block until a batch after `from_consumed` is ready, `interrupt` fires,
    /// or `timeout` elapses
    pub(crate) fn wait_for_batch(
        &self,
        from_consumed: u64,
        timeout: Duration,
        interrupt: impl Fn() -> bool,
    ) -> Range<u64> {
        self.consumer_wait.wait_for(timeout, || {
            self.is_available(from_consumed + 1) || interrupt()
        });
        self.next_ready_batch(from_consumed)
    }

    /// Release every slot up to and including `sequence`
    ///
    /// Called only by the single consumer.
    pub(crate) fn advance_consumed(&self, sequence: u64) {
        debug_assert!(sequence >= self.consumed() && sequence <= self.claimed());
        self.consumed.store(sequence, Ordering::Release);
        self.producer_wait.signal();
    }

    /// Refuse all further claims and wake every waiter
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.producer_wait.signal();
        self.consumer_wait.signal();
    }

    /// Wake the consumer without publishing anything
    pub(crate) fn wake_consumer(&self) {
        self.consumer_wait.signal();
    }
}

/// A producer's registration between the closed check and the claim CAS
pub(crate) struct ClaimWindow<'a> {
    sequencer: &'a Sequencer,
}

impl ClaimWindow<'_> {
    /// Claim the next sequence; `None` when the ring is full
    pub(crate) fn claim(&self) -> Option<u64> {
        let seq = self.sequencer;
        let mut current = seq.claimed.load(Ordering::Relaxed);
        loop {
            let next = current + 1;
            // `current` may be stale, in which case the CAS below fails and retries
            if next.saturating_sub(seq.consumed.load(Ordering::Acquire)) > seq.capacity {
                return None;
            }

            match seq.claimed.compare_exchange_weak(
                current,
                next,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Some(next),
                Err(actual) => current = actual,
            }
        }
    }
}

impl Drop for ClaimWindow<'_> {
    fn drop(&mut self) {
        self.sequencer.claiming.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Read-only view of a pipeline's cursors
///
/// # Example
///
/// ```
/// use rust_async_logger::prelude::*;
/// use rust_async_logger::core::plugins::Plugins;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let plugins = Plugins::new(SystemProperties::isolated(), FileProperties::empty());
/// let mut logger = AsyncLogger::builder().plugins(Arc::new(plugins)).build().unwrap();
/// logger.info("one").unwrap();
/// logger.shutdown(Duration::from_secs(1));
///
/// let cursors = logger.sequencer();
/// assert_eq!(cursors.claimed(), 1);
/// assert_eq!(cursors.consumed(), 1);
/// ```
#[derive(Clone, Copy)]
pub struct SequencerView<'a> {
    sequencer: &'a Sequencer,
}

impl<'a> SequencerView<'a> {
    pub(crate) fn new(sequencer: &'a Sequencer) -> Self {
        Self { sequencer }
    }

    pub fn capacity(&self) -> usize {
        self.sequencer.capacity()
    }

    pub fn policy(&self) -> BackpressurePolicy {
        self.sequencer.policy()
    }

    /// Highest sequence handed to a producer
    pub fn claimed(&self) -> u64 {
        self.sequencer.claimed()
    }

    /// Highest sequence fully processed by the consumer
    pub fn consumed(&self) -> u64 {
        self.sequencer.consumed()
    }

    /// Highest sequence such that it and everything before it is published
    pub fn published(&self) -> u64 {
        self.sequencer.published()
    }

    pub fn remaining_capacity(&self) -> usize {
        self.sequencer.remaining_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.sequencer.is_closed()
    }
}
