//! Link metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-link counters, shared across reconnects
#[derive(Debug, Default)]
pub struct LinkMetrics {
    /// Complete lines received
    pub lines_received: AtomicU64,

    /// Raw bytes received
    pub bytes_received: AtomicU64,

    /// Lines written back to the sensor
    pub lines_sent: AtomicU64,

    /// Partial lines dropped for exceeding the length limit
    pub oversized_dropped: AtomicU64,
}

impl LinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_line(&self) {
        self.lines_received.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("aoii_transport_lines_total").increment(1);
    }

    pub fn record_bytes(&self, n: usize) {
        self.bytes_received.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_sent(&self) {
        self.lines_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_oversized(&self) {
        self.oversized_dropped.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("aoii_transport_oversized_total").increment(1);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> LinkSnapshot {
        LinkSnapshot {
            lines_received: self.lines_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            lines_sent: self.lines_sent.load(Ordering::Relaxed),
            oversized_dropped: self.oversized_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkSnapshot {
    pub lines_received: u64,
    pub bytes_received: u64,
    pub lines_sent: u64,
    pub oversized_dropped: u64,
}
