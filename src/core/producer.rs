//! Producer handle: the only way events enter the pipeline
//!
//! Every entry point follows the same three steps: claim a sequence, write
//! the claimed slot in place, publish. Typed values are serialized before the
//! claim so a slow or failing serializer never holds a slot.

use super::backpressure::BackpressurePolicy;
use super::error::Result;
use super::log_event::{LogEvent, PayloadSource};
use super::log_level::LogLevel;
use super::ring_buffer::RingBuffer;
use super::sequencer::{Claim, Sequencer};
use serde::Serialize;
use std::sync::Arc;

/// What happened to a submitted event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutcome {
    /// Published under this sequence; export happens later on the consumer
    Published(u64),
    /// Discarded by the backpressure policy and counted in the metrics
    Dropped,
    /// Below the pipeline's minimum level, never claimed
    Filtered,
}

impl LogOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, LogOutcome::Published(_))
    }

    pub fn sequence(&self) -> Option<u64> {
        match self {
            LogOutcome::Published(sequence) => Some(*sequence),
            _ => None,
        }
    }
}

/// Cheap, cloneable handle shared by application threads
///
/// # Example
///
/// ```
/// use rust_async_logger::{AsyncLogger, LogLevel};
/// use rust_async_logger::core::plugins::Plugins;
/// use rust_async_logger::core::properties::{FileProperties, SystemProperties};
/// use std::sync::Arc;
///
/// let plugins = Plugins::new(SystemProperties::isolated(), FileProperties::empty());
/// let logger = AsyncLogger::builder().plugins(Arc::new(plugins)).build().unwrap();
///
/// let producer = logger.producer();
/// let outcome = producer.log_value(LogLevel::Info, "hello").unwrap();
/// assert!(outcome.is_published());
/// ```
#[derive(Clone)]
pub struct Producer {
    ring: Arc<RingBuffer<LogEvent>>,
    sequencer: Arc<Sequencer>,
    min_level: LogLevel,
}

impl Producer {
    pub(crate) fn new(
        ring: Arc<RingBuffer<LogEvent>>,
        sequencer: Arc<Sequencer>,
        min_level: LogLevel,
    ) -> Self {
        Self {
            ring,
            sequencer,
            min_level,
        }
    }

    /// Submit a prepared event
    ///
    /// The event's sequence is replaced by the claimed one; everything else,
    /// including its timestamp and thread identity, is kept.
    ///
    /// # Errors
    ///
    /// - `BackpressureOverflow` when the ring is full under [`BackpressurePolicy::Fail`]
    /// - `LoggerStopped` after shutdown began
    pub fn log(&self, event: LogEvent) -> Result<LogOutcome> {
        if !self.is_enabled(event.level) {
            return Ok(LogOutcome::Filtered);
        }
        let level = event.level;
        self.submit(level, PayloadSource::Event(event))
    }

    /// Submit any serializable value
    ///
    /// # Errors
    ///
    /// As [`log`](Self::log), plus `JsonError` if `value` cannot be serialized.
    pub fn log_value<T: Serialize + ?Sized>(
        &self,
        level: LogLevel,
        value: &T,
    ) -> Result<LogOutcome> {
        if !self.is_enabled(level) {
            return Ok(LogOutcome::Filtered);
        }
        let value = serde_json::to_value(value)?;
        self.submit(level, PayloadSource::Value(value))
    }

    /// Submit raw bytes; they are copied into the slot's reusable buffer
    ///
    /// # Errors
    ///
    /// As [`log`](Self::log).
    pub fn log_bytes(&self, level: LogLevel, bytes: &[u8]) -> Result<LogOutcome> {
        if !self.is_enabled(level) {
            return Ok(LogOutcome::Filtered);
        }
        self.submit(level, PayloadSource::Bytes(bytes))
    }

    /// Backpressure policy chosen at construction
    pub fn policy(&self) -> BackpressurePolicy {
        self.sequencer.policy()
    }

    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    fn submit(&self, level: LogLevel, source: PayloadSource<'_>) -> Result<LogOutcome> {
        let sequence = match self.sequencer.claim_next()? {
            Claim::Claimed(sequence) => sequence,
            Claim::Dropped => return Ok(LogOutcome::Dropped),
        };

        // SAFETY: the claim gives this thread exclusive ownership of the slot
        // until `publish` below; the reference does not outlive this statement.
        unsafe { self.ring.slot_mut(sequence).fill(sequence, level, source) };

        self.sequencer.publish(sequence);
        Ok(LogOutcome::Published(sequence))
    }
}
