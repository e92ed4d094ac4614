//! Pipeline metrics for observability
//!
//! Counters for the producer side (published, dropped, rejected, blocked)
//! and the consumer side (exported, failed, shutdown losses).

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for pipeline observability
///
/// # Example
///
/// ```
/// use rust_async_logger::PipelineMetrics;
///
/// let metrics = PipelineMetrics::new();
///
/// metrics.record_published();
/// metrics.record_dropped();
///
/// assert_eq!(metrics.published(), 1);
/// assert_eq!(metrics.dropped_count(), 1);
/// ```
#[derive(Debug)]
pub struct PipelineMetrics {
    /// Events made visible to the consumer
    published: AtomicU64,

    /// Events whose dispatch completed with every exporter succeeding
    exported: AtomicU64,

    /// Individual exporter failures (error or panic) handed to the fault handler
    export_failures: AtomicU64,

    /// Events dropped because the ring was full
    dropped_count: AtomicU64,

    /// Events refused under the fail-immediately policy
    rejected: AtomicU64,

    /// Number of times a claim found the ring full
    queue_full_events: AtomicU64,

    /// Number of claims that had to wait for a free slot
    block_events: AtomicU64,

    /// Published events left undrained when the shutdown deadline expired
    shutdown_dropped: AtomicU64,

    /// Claimed sequences never published before the shutdown deadline
    abandoned_claims: AtomicU64,
}

impl PipelineMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            published: AtomicU64::new(0),
            exported: AtomicU64::new(0),
            export_failures: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            queue_full_events: AtomicU64::new(0),
            block_events: AtomicU64::new(0),
            shutdown_dropped: AtomicU64::new(0),
            abandoned_claims: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn exported(&self) -> u64 {
        self.exported.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn export_failures(&self) -> u64 {
        self.export_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_full_events(&self) -> u64 {
        self.queue_full_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn block_events(&self) -> u64 {
        self.block_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn shutdown_dropped(&self) -> u64 {
        self.shutdown_dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn abandoned_claims(&self) -> u64 {
        self.abandoned_claims.load(Ordering::Relaxed)
    }

    /// Record a published event
    #[inline]
    pub fn record_published(&self) -> u64 {
        self.published.fetch_add(1, Ordering::Relaxed)
    }

    /// Record an event exported without failures
    #[inline]
    pub fn record_exported(&self) -> u64 {
        self.exported.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a single exporter failure
    #[inline]
    pub fn record_export_failure(&self) -> u64 {
        self.export_failures.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a dropped event, returning the previous count
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_rejected(&self) -> u64 {
        self.rejected.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_queue_full(&self) -> u64 {
        self.queue_full_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_block(&self) -> u64 {
        self.block_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_shutdown_dropped(&self, count: u64) -> u64 {
        self.shutdown_dropped.fetch_add(count, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_abandoned(&self, count: u64) -> u64 {
        self.abandoned_claims.fetch_add(count, Ordering::Relaxed)
    }

    /// Events lost for any reason (backpressure drops and shutdown losses)
    pub fn total_lost(&self) -> u64 {
        self.dropped_count() + self.shutdown_dropped()
    }

    /// Get drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if no events have been offered.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.published() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.published.store(0, Ordering::Relaxed);
        self.exported.store(0, Ordering::Relaxed);
        self.export_failures.store(0, Ordering::Relaxed);
        self.dropped_count.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
        self.queue_full_events.store(0, Ordering::Relaxed);
        self.block_events.store(0, Ordering::Relaxed);
        self.shutdown_dropped.store(0, Ordering::Relaxed);
        self.abandoned_claims.store(0, Ordering::Relaxed);
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PipelineMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            published: AtomicU64::new(self.published()),
            exported: AtomicU64::new(self.exported()),
            export_failures: AtomicU64::new(self.export_failures()),
            dropped_count: AtomicU64::new(self.dropped_count()),
            rejected: AtomicU64::new(self.rejected()),
            queue_full_events: AtomicU64::new(self.queue_full_events()),
            block_events: AtomicU64::new(self.block_events()),
            shutdown_dropped: AtomicU64::new(self.shutdown_dropped()),
            abandoned_claims: AtomicU64::new(self.abandoned_claims()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = PipelineMetrics::new();
        assert_eq!(metrics.published(), 0);
        assert_eq!(metrics.exported(), 0);
        assert_eq!(metrics.dropped_count(), 0);
        assert_eq!(metrics.shutdown_dropped(), 0);
    }

    #[test]
    fn test_record_returns_previous_value() {
        let metrics = PipelineMetrics::new();
        assert_eq!(metrics.record_dropped(), 0);
        assert_eq!(metrics.record_dropped(), 1);
        assert_eq!(metrics.dropped_count(), 2);
    }

    #[test]
    fn test_drop_rate() {
        let metrics = PipelineMetrics::new();
        assert_eq!(metrics.drop_rate(), 0.0);

        for _ in 0..90 {
            metrics.record_published();
        }
        for _ in 0..10 {
            metrics.record_dropped();
        }

        let rate = metrics.drop_rate();
        assert!((9.9..=10.1).contains(&rate), "Drop rate was {}", rate);
    }

    #[test]
    fn test_total_lost_includes_shutdown_losses() {
        let metrics = PipelineMetrics::new();
        metrics.record_dropped();
        metrics.record_shutdown_dropped(4);
        assert_eq!(metrics.total_lost(), 5);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let metrics = PipelineMetrics::new();
        metrics.record_exported();

        let snapshot = metrics.clone();
        metrics.record_exported();

        assert_eq!(snapshot.exported(), 1);
        assert_eq!(metrics.exported(), 2);

        metrics.reset();
        assert_eq!(metrics.exported(), 0);
        assert_eq!(snapshot.exported(), 1);
    }
}
