//! AuditRow - one line of the edge-audit log.

use serde::{Deserialize, Serialize};

/// Why a line was transmitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    /// First observation, always transmitted
    First,
    /// Temperature or humidity error exceeded its threshold
    Threshold,
    /// Heartbeat tick limit reached
    Heartbeat,
}

/// Per-line decision recorded by the edge mirror
///
/// Written for every replayed row, including skipped ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRow {
    /// Zero-based row index in the replayed stream
    pub tick: u64,

    /// Capture time as recorded in the dataset
    pub timestamp: String,

    /// Normalized time of day
    pub time_n: f64,

    pub actual_t: f64,
    pub actual_h: f64,

    /// Baseline the decision was taken against
    pub baseline_t: f64,
    pub baseline_h: f64,

    pub error_t: f64,
    pub error_h: f64,

    /// Ticks since the last transmission, before this decision
    pub ticks_since_send: u32,

    pub triggered: bool,

    /// `None` when the line was skipped
    pub reason: Option<TriggerReason>,

    /// Cumulative transmissions including this line
    pub total_tx: u64,
}
