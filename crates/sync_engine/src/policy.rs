//! Threshold / heartbeat transmission policy.

use contracts::{PolicyConfig, TriggerReason};

/// Transmission decision for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Send,
    Skip,
}

/// Pure policy rule.
///
/// `Send` when either error exceeds its threshold or the heartbeat limit is
/// reached.
pub fn decide(
    actual: (f64, f64),
    baseline: (f64, f64),
    ticks_since_send: u32,
    beta_temp: f64,
    beta_hum: f64,
    heartbeat_limit: u32,
) -> Decision {
    if trigger_reason(actual, baseline, ticks_since_send, beta_temp, beta_hum, heartbeat_limit)
        .is_some()
    {
        Decision::Send
    } else {
        Decision::Skip
    }
}

/// Same rule as [`decide`], reporting which condition fired.
///
/// Threshold wins over heartbeat when both hold.
pub fn trigger_reason(
    actual: (f64, f64),
    baseline: (f64, f64),
    ticks_since_send: u32,
    beta_temp: f64,
    beta_hum: f64,
    heartbeat_limit: u32,
) -> Option<TriggerReason> {
    let exceeded = (actual.0 - baseline.0).abs() > beta_temp
        || (actual.1 - baseline.1).abs() > beta_hum;

    if exceeded {
        Some(TriggerReason::Threshold)
    } else if ticks_since_send >= heartbeat_limit {
        Some(TriggerReason::Heartbeat)
    } else {
        None
    }
}

/// Result of observing one value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub decision: Decision,
    pub reason: Option<TriggerReason>,
    /// Baseline the value was compared against
    pub baseline: (f64, f64),
    /// Tick counter before this observation
    pub ticks_since_send: u32,
}

/// Sensor-side policy state
#[derive(Debug, Clone)]
pub struct PolicyState {
    config: PolicyConfig,
    last_sent: Option<(f64, f64)>,
    ticks_since_send: u32,
}

impl PolicyState {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config,
            last_sent: None,
            ticks_since_send: 0,
        }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Last transmitted value
    pub fn last_sent(&self) -> Option<(f64, f64)> {
        self.last_sent
    }

    pub fn ticks_since_send(&self) -> u32 {
        self.ticks_since_send
    }

    /// Observe against the last transmitted value
    pub fn observe(&mut self, actual: (f64, f64)) -> Verdict {
        self.evaluate(actual, None)
    }

    /// Observe against an externally supplied baseline (e.g. a prediction)
    pub fn observe_against(&mut self, actual: (f64, f64), baseline: (f64, f64)) -> Verdict {
        self.evaluate(actual, Some(baseline))
    }

    fn evaluate(&mut self, actual: (f64, f64), reference: Option<(f64, f64)>) -> Verdict {
        let ticks_since_send = self.ticks_since_send;

        let Some(last_sent) = self.last_sent else {
            // First tick: seed, implicitly transmitted
            self.commit_send(actual);
            return Verdict {
                decision: Decision::Send,
                reason: Some(TriggerReason::First),
                baseline: actual,
                ticks_since_send,
            };
        };

        let baseline = reference.unwrap_or(last_sent);
        let reason = trigger_reason(
            actual,
            baseline,
            ticks_since_send,
            self.config.beta_temp,
            self.config.beta_hum,
            self.config.heartbeat_ticks,
        );

        let decision = match reason {
            Some(_) => {
                self.commit_send(actual);
                Decision::Send
            }
            None => {
                self.ticks_since_send = self.ticks_since_send.saturating_add(1);
                Decision::Skip
            }
        };

        Verdict {
            decision,
            reason,
            baseline,
            ticks_since_send,
        }
    }

    fn commit_send(&mut self, actual: (f64, f64)) {
        self.last_sent = Some(actual);
        self.ticks_since_send = 0;
    }
}
