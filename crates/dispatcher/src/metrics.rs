//! Per-receiver counters kept in process for run summaries

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Metrics for a single receiver
#[derive(Debug, Default)]
pub struct ReceiverMetrics {
    /// Payloads written by the sink
    delivered: AtomicU64,
    /// Sink write failures
    failed: AtomicU64,
    /// Records dropped by filter rules
    filtered: AtomicU64,
    /// Records reshaped by the transformer
    transformed: AtomicU64,
}

impl ReceiverMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get delivered count
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Increment delivered count
    pub fn inc_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Get failure count
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Increment failure count
    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get filtered count
    pub fn filtered(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    /// Increment filtered count
    pub fn inc_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    /// Get transformed count
    pub fn transformed(&self) -> u64 {
        self.transformed.load(Ordering::Relaxed)
    }

    /// Increment transformed count
    pub fn inc_transformed(&self) {
        self.transformed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> ReceiverMetricsSnapshot {
        ReceiverMetricsSnapshot {
            delivered: self.delivered(),
            failed: self.failed(),
            filtered: self.filtered(),
            transformed: self.transformed(),
        }
    }
}

/// Snapshot of receiver metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReceiverMetricsSnapshot {
    pub delivered: u64,
    pub failed: u64,
    pub filtered: u64,
    pub transformed: u64,
}
