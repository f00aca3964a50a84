//! Sync protocol state machine.

use chrono::{DateTime, FixedOffset, TimeDelta};
use contracts::{time_of_day_fraction, ProtocolConfig, Reading, TransmissionEvent};
use predictor::{Prediction, Predictor};
use tracing::{debug, info, instrument};

use crate::classifier::{LineClassifier, LineKind};

/// Protocol state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    /// Between iterations
    Idle,
    /// Waiting for a complete line
    AwaitingLine,
    /// Parsing a received line
    Classifying,
    /// Answering a sentinel ping
    ProcessingPing,
    /// Updating the model from a real reading
    ProcessingReading,
}

/// What a line produced
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineOutcome {
    /// Event for the dispatcher
    pub event: Option<TransmissionEvent>,
    /// Clock-sync reply for the sensor (UTC epoch seconds, no newline)
    pub reply: Option<String>,
}

/// Per-engine counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub lines: u64,
    pub discarded: u64,
    pub pings: u64,
    pub readings: u64,
    pub estimates: u64,
}

/// Gateway side of the sync protocol
///
/// Owns the predictor; every prediction and update goes through here.
#[derive(Debug)]
pub struct SyncEngine {
    predictor: Predictor,
    classifier: LineClassifier,
    learning_rate: f64,
    estimate_interval: TimeDelta,
    state: ProtocolState,
    /// Cumulative RX count
    sequence: u64,
    /// Prediction of the current iteration
    current: Option<Prediction>,
    last_estimate_at: DateTime<FixedOffset>,
    stats: EngineStats,
}

impl SyncEngine {
    /// Create an engine; the EST timer starts at `started_at`
    pub fn new(
        predictor: Predictor,
        protocol: &ProtocolConfig,
        started_at: DateTime<FixedOffset>,
    ) -> Self {
        let estimate_interval = i64::try_from(protocol.estimate_interval_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        Self {
            predictor,
            classifier: LineClassifier::new(protocol.marker.clone()),
            learning_rate: protocol.learning_rate,
            estimate_interval,
            state: ProtocolState::Idle,
            sequence: 0,
            current: None,
            last_estimate_at: started_at,
            stats: EngineStats::default(),
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Cumulative transmission count
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    /// Prediction a reading arriving now is compared against
    pub fn current_prediction(&self) -> (f64, f64) {
        self.current
            .as_ref()
            .map_or_else(|| self.predictor.last_prediction(), |p| p.values)
    }

    /// Start of an iteration: roll the model forward to `now`
    pub fn tick(&mut self, now: DateTime<FixedOffset>) -> (f64, f64) {
        let prediction = self.predictor.rollout(time_of_day_fraction(&now));
        let values = prediction.values;
        self.current = Some(prediction);
        values
    }

    /// Enter `AwaitingLine`
    pub fn await_line(&mut self) {
        self.state = ProtocolState::AwaitingLine;
    }

    /// Poll interval elapsed with no line
    pub fn poll_elapsed(&mut self) {
        // Still waiting; the next iteration polls again
        self.state = ProtocolState::AwaitingLine;
    }

    /// Classify and process one line
    #[instrument(level = "trace", name = "sync_engine_line", skip(self, now))]
    pub fn handle_line(&mut self, line: &str, now: DateTime<FixedOffset>) -> LineOutcome {
        self.state = ProtocolState::Classifying;
        self.stats.lines += 1;

        let outcome = match self.classifier.classify(line) {
            LineKind::Malformed(reason) => {
                self.stats.discarded += 1;
                observability::record_line_discarded(reason.as_label());
                debug!(?reason, "line discarded");
                LineOutcome::default()
            }
            LineKind::Ping => {
                self.state = ProtocolState::ProcessingPing;
                self.stats.pings += 1;
                debug!("sync ping, clock reply only");
                LineOutcome {
                    event: Some(TransmissionEvent::SyncPing { timestamp: now }),
                    reply: Some(clock_reply(&now)),
                }
            }
            LineKind::Reading {
                temperature,
                humidity,
            } => {
                self.state = ProtocolState::ProcessingReading;
                self.process_reading(temperature, humidity, now)
            }
        };

        self.state = ProtocolState::Idle;
        outcome
    }

    fn process_reading(
        &mut self,
        temperature: f64,
        humidity: f64,
        now: DateTime<FixedOffset>,
    ) -> LineOutcome {
        let prediction = match self.current.take() {
            Some(prediction) => prediction,
            None => self.predictor.rollout(time_of_day_fraction(&now)),
        };
        let predicted = prediction.values;
        let actual = (temperature, humidity);
        let error = (
            (actual.0 - predicted.0).abs(),
            (actual.1 - predicted.1).abs(),
        );

        self.sequence += 1;
        self.stats.readings += 1;

        self.predictor
            .update(&prediction.context, actual, self.learning_rate);
        self.predictor.sync_to(actual);
        self.last_estimate_at = now;

        info!(
            sequence = self.sequence,
            actual_t = actual.0,
            actual_h = actual.1,
            pred_t = predicted.0,
            pred_h = predicted.1,
            "reading received"
        );

        LineOutcome {
            event: Some(TransmissionEvent::Rx {
                reading: Reading::new(temperature, humidity, now),
                predicted,
                error,
                sequence: self.sequence,
            }),
            reply: Some(clock_reply(&now)),
        }
    }

    /// Emit an EST event once the estimate interval has elapsed since the
    /// last EST or RX.
    pub fn poll_estimate(&mut self, now: DateTime<FixedOffset>) -> Option<TransmissionEvent> {
        if now - self.last_estimate_at < self.estimate_interval {
            return None;
        }

        self.last_estimate_at = now;
        self.stats.estimates += 1;
        let predicted = self.current_prediction();
        debug!(pred_t = predicted.0, pred_h = predicted.1, "standalone estimate");

        Some(TransmissionEvent::Est {
            predicted,
            timestamp: now,
            sequence: self.sequence,
        })
    }
}

/// UTC epoch seconds as sent back to the sensor
pub fn clock_reply(now: &DateTime<FixedOffset>) -> String {
    now.timestamp().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use predictor::reference_model_spec;

    fn start() -> DateTime<FixedOffset> {
        FixedOffset::west_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 1, 12, 0, 0)
            .unwrap()
    }

    fn engine() -> SyncEngine {
        let predictor = Predictor::from_spec(&reference_model_spec()).unwrap();
        let protocol = ProtocolConfig {
            marker: None,
            ..ProtocolConfig::default()
        };
        SyncEngine::new(predictor, &protocol, start())
    }

    #[test]
    fn test_reading_emits_rx_and_reply() {
        let mut engine = engine();
        let now = start();
        let predicted = engine.tick(now);

        let outcome = engine.handle_line("22.10,48.30", now);
        assert_eq!(outcome.reply.as_deref(), Some(now.timestamp().to_string().as_str()));
        match outcome.event {
            Some(TransmissionEvent::Rx {
                reading,
                predicted: p,
                error,
                sequence,
            }) => {
                assert_eq!(reading.values(), (22.1, 48.3));
                assert_eq!(p, predicted);
                assert!((error.0 - (22.1 - predicted.0).abs()).abs() < 1e-12);
                assert_eq!(sequence, 1);
            }
            other => panic!("expected Rx, got {other:?}"),
        }
        assert_eq!(engine.sequence(), 1);
        assert_eq!(engine.state(), ProtocolState::Idle);
        assert_eq!(engine.predictor().last_prediction(), (22.1, 48.3));
        assert_eq!(engine.predictor().update_count(), 1);
    }

    #[test]
    fn test_ping_leaves_model_untouched() {
        let mut engine = engine();
        let now = start();
        engine.tick(now);
        let before = engine.predictor().last_prediction();

        let outcome = engine.handle_line("0.0,0.0", now);
        assert!(matches!(
            outcome.event,
            Some(TransmissionEvent::SyncPing { .. })
        ));
        assert!(outcome.reply.is_some());
        assert_eq!(engine.sequence(), 0);
        assert_eq!(engine.predictor().update_count(), 0);
        assert_eq!(engine.predictor().last_prediction(), before);
    }

    #[test]
    fn test_malformed_line_has_no_effect() {
        let mut engine = engine();
        let now = start();
        engine.tick(now);

        let outcome = engine.handle_line("garbage", now);
        assert_eq!(outcome, LineOutcome::default());
        assert_eq!(engine.sequence(), 0);
        assert_eq!(engine.stats().discarded, 1);
        assert_eq!(engine.state(), ProtocolState::Idle);
    }

    #[test]
    fn test_sequence_counts_only_rx() {
        let mut engine = engine();
        let mut now = start();
        let lines = ["21.0,40.0", "0.0,0.0", "bad", "21.5,41.0", "0.0,0.0", "22.0,42.0"];
        for line in lines {
            engine.tick(now);
            engine.handle_line(line, now);
            now += TimeDelta::seconds(61);
            engine.poll_estimate(now);
        }
        assert_eq!(engine.sequence(), 3);
        assert_eq!(engine.stats().pings, 2);
        assert!(engine.stats().estimates > 0);
    }

    #[test]
    fn test_estimate_timer() {
        let mut engine = engine();
        let t0 = start();
        engine.tick(t0);
        assert!(engine.poll_estimate(t0 + TimeDelta::seconds(59)).is_none());

        let est = engine.poll_estimate(t0 + TimeDelta::seconds(60));
        match est {
            Some(TransmissionEvent::Est { sequence, predicted, .. }) => {
                assert_eq!(sequence, 0);
                assert_eq!(predicted, engine.current_prediction());
            }
            other => panic!("expected Est, got {other:?}"),
        }
        assert!(engine.poll_estimate(t0 + TimeDelta::seconds(61)).is_none());
    }

    #[test]
    fn test_rx_resets_estimate_timer() {
        let mut engine = engine();
        let t0 = start();
        engine.tick(t0);
        engine.handle_line("22.1,48.3", t0 + TimeDelta::seconds(50));
        assert!(engine.poll_estimate(t0 + TimeDelta::seconds(70)).is_none());
        assert!(engine.poll_estimate(t0 + TimeDelta::seconds(110)).is_some());
    }

    #[test]
    fn test_reading_without_tick_predicts_first() {
        let mut engine = engine();
        let outcome = engine.handle_line("22.1,48.3", start());
        assert!(matches!(
            outcome.event,
            Some(TransmissionEvent::Rx { sequence: 1, .. })
        ));
    }

    #[test]
    fn test_default_protocol_bare_reading_then_ping() {
        let predictor = Predictor::from_spec(&reference_model_spec()).unwrap();
        let mut engine = SyncEngine::new(predictor, &ProtocolConfig::default(), start());
        let now = start();
        engine.tick(now);

        let outcome = engine.handle_line("22.10,48.30", now);
        assert_eq!(outcome.reply, Some(now.timestamp().to_string()));
        match outcome.event {
            Some(TransmissionEvent::Rx {
                reading, sequence, ..
            }) => {
                assert_eq!(sequence, 1);
                assert_eq!((reading.temperature, reading.humidity), (22.1, 48.3));
            }
            other => panic!("expected Rx, got {other:?}"),
        }

        let outcome = engine.handle_line("0.0,0.0", now);
        assert!(matches!(
            outcome.event,
            Some(TransmissionEvent::SyncPing { .. })
        ));
        assert_eq!(outcome.reply, Some(now.timestamp().to_string()));
        assert_eq!(engine.sequence(), 1);
    }

    #[test]
    fn test_marker_configured() {
        let predictor = Predictor::from_spec(&reference_model_spec()).unwrap();
        let mut engine = SyncEngine::new(predictor, &ProtocolConfig::default(), start());
        assert!(engine.handle_line("Sent: 22.1,48.3", start()).event.is_none());
        assert!(engine
            .handle_line("[LoRa] Received: 22.1,48.3", start())
            .event
            .is_some());
        assert_eq!(engine.sequence(), 1);
    }
}
