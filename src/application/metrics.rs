//! Logging metrics.
//!
//! Counts what every `log()` call decided, for monitoring how much output the
//! filters and `Every` policies are holding back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters shared by every logger of a factory.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Registries written to a sink
    events_emitted: AtomicU64,
    /// Registries suppressed by a filter or an `Every` policy
    events_suppressed: AtomicU64,
    /// Times a history store was flushed through the factory
    history_flushes: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                events_emitted: AtomicU64::new(0),
                events_suppressed: AtomicU64::new(0),
                history_flushes: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn record_emitted(&self) {
        self.inner.events_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_suppressed(&self) {
        self.inner.events_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flush(&self) {
        self.inner.history_flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the total number of registries written to a sink.
    pub fn events_emitted(&self) -> u64 {
        self.inner.events_emitted.load(Ordering::Relaxed)
    }

    /// Get the total number of suppressed registries.
    pub fn events_suppressed(&self) -> u64 {
        self.inner.events_suppressed.load(Ordering::Relaxed)
    }

    /// Get the number of history flushes.
    pub fn history_flushes(&self) -> u64 {
        self.inner.history_flushes.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_emitted: self.events_emitted(),
            events_suppressed: self.events_suppressed(),
            history_flushes: self.history_flushes(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.inner.events_emitted.store(0, Ordering::Relaxed);
        self.inner.events_suppressed.store(0, Ordering::Relaxed);
        self.inner.history_flushes.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_emitted: u64,
    pub events_suppressed: u64,
    pub history_flushes: u64,
}

impl MetricsSnapshot {
    /// Ratio of suppressed registries to all logged registries (0.0 to 1.0).
    ///
    /// Returns 0.0 if nothing has been logged.
    pub fn suppression_rate(&self) -> f64 {
        let total = self.total_events();
        if total == 0 {
            0.0
        } else {
            self.events_suppressed as f64 / total as f64
        }
    }

    /// Get the total number of logged registries (emitted + suppressed).
    pub fn total_events(&self) -> u64 {
        self.events_emitted.saturating_add(self.events_suppressed)
    }
}
