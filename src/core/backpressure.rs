//! Backpressure policies for a full ring buffer
//!
//! When producers outrun the consumer and every slot is still waiting to be
//! consumed, the policy chosen at construction decides what a producer does.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Policy applied when a producer finds no free slot in the ring
///
/// # Example
///
/// ```
/// use rust_async_logger::BackpressurePolicy;
/// use std::time::Duration;
///
/// // Default behavior: wait for the consumer
/// let policy = BackpressurePolicy::default();
/// assert_eq!(policy, BackpressurePolicy::Block);
///
/// // Policies can be read from configuration strings
/// let policy: BackpressurePolicy = "block:250".parse().unwrap();
/// assert_eq!(policy, BackpressurePolicy::BlockWithTimeout(Duration::from_millis(250)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackpressurePolicy {
    /// Wait until the consumer frees a slot
    ///
    /// No event is ever lost to backpressure, at the cost of producer latency.
    #[default]
    Block,

    /// Wait up to the given duration, then drop the event and count it
    BlockWithTimeout(Duration),

    /// Drop the event immediately and count it
    ///
    /// `log` still returns successfully; the drop shows up in metrics.
    Drop,

    /// Refuse the event with `BackpressureOverflow`
    Fail,
}

impl BackpressurePolicy {
    /// Whether producers may suspend under this policy
    pub fn may_block(&self) -> bool {
        matches!(
            self,
            BackpressurePolicy::Block | BackpressurePolicy::BlockWithTimeout(_)
        )
    }
}

impl fmt::Display for BackpressurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackpressurePolicy::Block => write!(f, "Block"),
            BackpressurePolicy::BlockWithTimeout(d) => write!(f, "BlockWithTimeout({:?})", d),
            BackpressurePolicy::Drop => write!(f, "Drop"),
            BackpressurePolicy::Fail => write!(f, "Fail"),
        }
    }
}

impl FromStr for BackpressurePolicy {
    type Err = String;

    /// Parse `block`, `drop`, `fail` or `block:<millis>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "block" => Ok(BackpressurePolicy::Block),
            "drop" => Ok(BackpressurePolicy::Drop),
            "fail" => Ok(BackpressurePolicy::Fail),
            _ => match s.strip_prefix("block:") {
                Some(ms) => ms
                    .trim()
                    .parse::<u64>()
                    .map(|ms| BackpressurePolicy::BlockWithTimeout(Duration::from_millis(ms)))
                    .map_err(|_| format!("Invalid block timeout: '{}'", ms)),
                None => Err(format!("Invalid backpressure policy: '{}'", s)),
            },
        }
    }
}

/// Callback type for drop notifications
///
/// Called when events are dropped because the ring is full.
/// The parameter is the total count of dropped events so far.
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;
