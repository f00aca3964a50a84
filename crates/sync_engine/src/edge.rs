//! Edge mirror: replays the sensor's transmission decisions host-side.

use contracts::{round_to, AuditRow, PolicyConfig};
use predictor::Predictor;

use crate::policy::{Decision, PolicyState};

/// What the edge compares each reading against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaselineMode {
    /// Last transmitted reading (threshold-only compare group)
    #[default]
    LastSent,
    /// The edge's own rollout prediction
    Model,
}

/// Host-side replica of the sensor node
#[derive(Debug)]
pub struct EdgeMirror {
    policy: PolicyState,
    /// Present in `Model` mode
    predictor: Option<Predictor>,
    learning_rate: f64,
    tick: u64,
    total_tx: u64,
}

impl EdgeMirror {
    /// Threshold-only mirror
    pub fn last_sent(policy: PolicyConfig) -> Self {
        Self {
            policy: PolicyState::new(policy),
            predictor: None,
            learning_rate: 0.0,
            tick: 0,
            total_tx: 0,
        }
    }

    /// Predictive mirror, updated with the same rule as the gateway
    pub fn model(policy: PolicyConfig, predictor: Predictor, learning_rate: f64) -> Self {
        Self {
            policy: PolicyState::new(policy),
            predictor: Some(predictor),
            learning_rate,
            tick: 0,
            total_tx: 0,
        }
    }

    pub fn mode(&self) -> BaselineMode {
        if self.predictor.is_some() {
            BaselineMode::Model
        } else {
            BaselineMode::LastSent
        }
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }

    pub fn total_tx(&self) -> u64 {
        self.total_tx
    }

    /// Fraction of ticks that were not transmitted
    pub fn savings_ratio(&self) -> f64 {
        if self.tick == 0 {
            0.0
        } else {
            1.0 - self.total_tx as f64 / self.tick as f64
        }
    }

    /// Decide for one reading and return its audit row
    pub fn step(&mut self, actual: (f64, f64), time_fraction: f64, timestamp: &str) -> AuditRow {
        let verdict = match self.predictor.as_mut() {
            Some(predictor) => {
                let prediction = predictor.rollout(time_fraction);
                let verdict = self.policy.observe_against(actual, prediction.values);
                if verdict.decision == Decision::Send {
                    predictor.update(&prediction.context, actual, self.learning_rate);
                    predictor.sync_to(actual);
                }
                verdict
            }
            None => self.policy.observe(actual),
        };

        let triggered = verdict.decision == Decision::Send;
        if triggered {
            self.total_tx += 1;
        }

        let row = AuditRow {
            tick: self.tick,
            timestamp: timestamp.to_string(),
            time_n: round_to(time_fraction, 4),
            actual_t: actual.0,
            actual_h: actual.1,
            baseline_t: verdict.baseline.0,
            baseline_h: verdict.baseline.1,
            error_t: (actual.0 - verdict.baseline.0).abs(),
            error_h: (actual.1 - verdict.baseline.1).abs(),
            ticks_since_send: verdict.ticks_since_send,
            triggered,
            reason: verdict.reason,
            total_tx: self.total_tx,
        };
        self.tick += 1;
        row
    }
}
