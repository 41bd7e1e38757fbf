//! Process-wide, lock-free call metrics.
//!
//! A single [`Metrics`] instance is created once via [`Metrics::global`] and
//! shared by every client and executor in the process. Counters are plain
//! `AtomicU64`s; there is no interior locking on the hot path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

static GLOBAL: OnceLock<Metrics> = OnceLock::new();

/// Process-wide call counters.
#[derive(Debug, Default)]
pub struct Metrics {
    calls_total: AtomicU64,
    calls_succeeded: AtomicU64,
    calls_failed: AtomicU64,
    call_duration_micros_total: AtomicU64,
    batches_total: AtomicU64,
    batch_calls_total: AtomicU64,
    batch_calls_succeeded: AtomicU64,
}

impl Metrics {
    /// Return the single process-wide instance, creating it on first access.
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(Self::default)
    }

    /// Record the outcome of a single sub-agent call.
    pub fn record_call(&self, _agent: &str, duration: Duration, success: bool) {
        self.calls_total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.calls_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.calls_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.call_duration_micros_total.fetch_add(
            u64::try_from(duration.as_micros()).unwrap_or(u64::MAX),
            Ordering::Relaxed,
        );
    }

    /// Record a completed parallel batch.
    pub fn record_batch(&self, batch_size: usize, successful_count: usize, _total_duration: Duration) {
        self.batches_total.fetch_add(1, Ordering::Relaxed);
        self.batch_calls_total
            .fetch_add(batch_size as u64, Ordering::Relaxed);
        self.batch_calls_succeeded
            .fetch_add(successful_count as u64, Ordering::Relaxed);
    }

    /// Total number of sub-agent calls recorded so far.
    #[must_use]
    pub fn calls_total(&self) -> u64 {
        self.calls_total.load(Ordering::Relaxed)
    }

    /// Total number of successful sub-agent calls recorded so far.
    #[must_use]
    pub fn calls_succeeded(&self) -> u64 {
        self.calls_succeeded.load(Ordering::Relaxed)
    }

    /// Total number of failed sub-agent calls recorded so far.
    #[must_use]
    pub fn calls_failed(&self) -> u64 {
        self.calls_failed.load(Ordering::Relaxed)
    }

    /// Total number of parallel batches recorded so far.
    #[must_use]
    pub fn batches_total(&self) -> u64 {
        self.batches_total.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_returns_same_instance() {
        let a = Metrics::global() as *const Metrics;
        let b = Metrics::global() as *const Metrics;
        assert_eq!(a, b);
    }

    #[test]
    fn record_call_updates_counters() {
        let metrics = Metrics::default();
        metrics.record_call("agent-a", Duration::from_millis(5), true);
        metrics.record_call("agent-a", Duration::from_millis(5), false);
        assert_eq!(metrics.calls_total(), 2);
        assert_eq!(metrics.calls_succeeded(), 1);
        assert_eq!(metrics.calls_failed(), 1);
    }

    #[test]
    fn record_batch_updates_counters() {
        let metrics = Metrics::default();
        metrics.record_batch(3, 2, Duration::from_millis(40));
        assert_eq!(metrics.batches_total(), 1);
    }
}
