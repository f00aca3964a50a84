//! TransmissionEvent - Sync protocol output, EventRecord - Dispatcher payload.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::{time_of_day_fraction, Reading};

/// Timestamp layout used by event records
pub const RECORD_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Event produced by the sync protocol for one tick
///
/// Ephemeral: consumed immediately by the dispatcher, never retained.
#[derive(Debug, Clone, PartialEq)]
pub enum TransmissionEvent {
    /// Real reading received from the sensor
    Rx {
        reading: Reading,
        /// Gateway prediction the reading is compared against
        predicted: (f64, f64),
        /// Absolute prediction error
        error: (f64, f64),
        /// Cumulative transmission count, including this reception
        sequence: u64,
    },

    /// Gateway standalone estimate (no ground truth)
    Est {
        predicted: (f64, f64),
        timestamp: DateTime<FixedOffset>,
        /// Cumulative transmission count at emission time
        sequence: u64,
    },

    /// Sentinel ping, only requests a clock-sync reply
    SyncPing { timestamp: DateTime<FixedOffset> },
}

impl TransmissionEvent {
    /// Short label for logs and metrics
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Rx { .. } => "rx",
            Self::Est { .. } => "est",
            Self::SyncPing { .. } => "sync_ping",
        }
    }

    /// Local time the event refers to
    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        match self {
            Self::Rx { reading, .. } => reading.captured_at,
            Self::Est { timestamp, .. } | Self::SyncPing { timestamp } => *timestamp,
        }
    }
}

/// Record kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventKind {
    Rx,
    Est,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rx => "RX",
            Self::Est => "EST",
        }
    }
}

/// Structured record published to the message bus and persisted by sinks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event: EventKind,

    /// Local time, `%Y-%m-%d %H:%M:%S`
    pub timestamp: String,

    /// Normalized time of day (4 decimals)
    pub time_n: f64,

    pub actual_t: Option<f64>,
    pub actual_h: Option<f64>,
    pub pred_t: f64,
    pub pred_h: f64,
    pub error_t: Option<f64>,
    pub error_h: Option<f64>,

    /// Cumulative transmission count
    pub total_tx: u64,
}

impl EventRecord {
    /// Convert a protocol event into its record form.
    ///
    /// Sync pings carry no data and have no record representation.
    pub fn from_event(event: &TransmissionEvent) -> Option<Self> {
        match event {
            TransmissionEvent::Rx {
                reading,
                predicted,
                error,
                sequence,
            } => Some(Self {
                event: EventKind::Rx,
                timestamp: format_timestamp(&reading.captured_at),
                time_n: round_to(reading.time_fraction, 4),
                actual_t: Some(round_to(reading.temperature, 2)),
                actual_h: Some(round_to(reading.humidity, 2)),
                pred_t: round_to(predicted.0, 2),
                pred_h: round_to(predicted.1, 2),
                error_t: Some(round_to(error.0, 2)),
                error_h: Some(round_to(error.1, 2)),
                total_tx: *sequence,
            }),
            TransmissionEvent::Est {
                predicted,
                timestamp,
                sequence,
            } => Some(Self {
                event: EventKind::Est,
                timestamp: format_timestamp(timestamp),
                time_n: round_to(time_of_day_fraction(timestamp), 4),
                actual_t: None,
                actual_h: None,
                pred_t: round_to(predicted.0, 2),
                pred_h: round_to(predicted.1, 2),
                error_t: None,
                error_h: None,
                total_tx: *sequence,
            }),
            TransmissionEvent::SyncPing { .. } => None,
        }
    }
}

fn format_timestamp(at: &DateTime<FixedOffset>) -> String {
    at.format(RECORD_TIMESTAMP_FORMAT).to_string()
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<FixedOffset> {
        FixedOffset::west_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 1, h, m, s)
            .unwrap()
    }

    #[test]
    fn test_rx_record_fields() {
        let event = TransmissionEvent::Rx {
            reading: Reading::new(22.1, 48.3, at(12, 0, 0)),
            predicted: (21.876, 47.001),
            error: (0.224, 1.299),
            sequence: 3,
        };
        let record = EventRecord::from_event(&event).unwrap();
        assert_eq!(record.event, EventKind::Rx);
        assert_eq!(record.timestamp, "2025-03-01 12:00:00");
        assert_eq!(record.time_n, 0.5);
        assert_eq!(record.actual_t, Some(22.1));
        assert_eq!(record.pred_t, 21.88);
        assert_eq!(record.error_h, Some(1.3));
        assert_eq!(record.total_tx, 3);
    }

    #[test]
    fn test_est_record_has_no_ground_truth() {
        let event = TransmissionEvent::Est {
            predicted: (15.0, 40.0),
            timestamp: at(6, 0, 0),
            sequence: 7,
        };
        let record = EventRecord::from_event(&event).unwrap();
        assert_eq!(record.event, EventKind::Est);
        assert_eq!(record.actual_t, None);
        assert_eq!(record.error_t, None);
        assert_eq!(record.time_n, 0.25);
        assert_eq!(record.total_tx, 7);
    }

    #[test]
    fn test_ping_has_no_record() {
        let event = TransmissionEvent::SyncPing {
            timestamp: at(1, 2, 3),
        };
        assert!(EventRecord::from_event(&event).is_none());
        assert_eq!(event.kind_label(), "sync_ping");
    }

    #[test]
    fn test_record_json_layout() {
        let event = TransmissionEvent::Est {
            predicted: (15.0, 40.0),
            timestamp: at(6, 0, 0),
            sequence: 0,
        };
        let record = EventRecord::from_event(&event).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["event"], "EST");
        assert!(json["actual_t"].is_null());
        assert_eq!(json["total_tx"], 0);
    }
}
