//! Registry metrics.
//!
//! Lock-free counters describing how expectations resolve, suitable for
//! periodic export by the host.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Create a new counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment by 1.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment by n.
    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    /// Get current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// A gauge metric.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    /// Create a new gauge.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment by 1.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement by 1, saturating at zero.
    pub fn dec(&self) {
        let _ = self
            .value
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(1))
            });
    }

    /// Get current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Counters maintained by an expectation registry.
#[derive(Debug, Default)]
pub struct RegistryMetrics {
    /// Expectations accepted by `register`.
    pub registered: Counter,
    /// Expectations fulfilled by a matching exchange.
    pub fulfilled: Counter,
    /// Expectations whose deadline passed.
    pub expired: Counter,
    /// Expectations that failed.
    pub failed: Counter,
    /// Expectations removed from the registry.
    pub evicted: Counter,
    /// Exchanges delivered by traffic feeds.
    pub exchanges_observed: Counter,
    /// Exchanges that fulfilled an expectation.
    pub exchanges_matched: Counter,
    /// Expectations currently waiting.
    pub waiting: Gauge,
}

impl RegistryMetrics {
    /// Create zeroed metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a consistent-enough copy for export.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            registered: self.registered.get(),
            fulfilled: self.fulfilled.get(),
            expired: self.expired.get(),
            failed: self.failed.get(),
            evicted: self.evicted.get(),
            exchanges_observed: self.exchanges_observed.get(),
            exchanges_matched: self.exchanges_matched.get(),
            waiting: self.waiting.get(),
        }
    }
}

/// Point-in-time copy of [`RegistryMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Expectations accepted by `register`.
    pub registered: u64,
    /// Expectations fulfilled.
    pub fulfilled: u64,
    /// Expectations expired.
    pub expired: u64,
    /// Expectations failed.
    pub failed: u64,
    /// Expectations evicted.
    pub evicted: u64,
    /// Exchanges observed.
    pub exchanges_observed: u64,
    /// Exchanges that fulfilled an expectation.
    pub exchanges_matched: u64,
    /// Expectations currently waiting.
    pub waiting: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_ops() {
        let counter = Counter::new();
        counter.inc();
        counter.add(4);
        assert_eq!(counter.get(), 5);
    }

    #[test]
    fn gauge_saturates_at_zero() {
        let gauge = Gauge::new();
        gauge.inc();
        gauge.dec();
        gauge.dec();
        assert_eq!(gauge.get(), 0);
    }

    #[test]
    fn snapshot_copies_values() {
        let metrics = RegistryMetrics::new();
        metrics.registered.inc();
        metrics.waiting.inc();
        metrics.exchanges_observed.add(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.registered, 1);
        assert_eq!(snapshot.waiting, 1);
        assert_eq!(snapshot.exchanges_observed, 3);
        assert_eq!(snapshot.fulfilled, 0);
    }
}
