//! Wall clock abstraction so the protocol can be driven deterministically.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use contracts::ContractError;

/// Source of local wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// System time shifted to a fixed UTC offset
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    /// # Errors
    /// Offset outside ±24h.
    pub fn new(utc_offset_minutes: i32) -> Result<Self, ContractError> {
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
            ContractError::config_validation(
                "protocol.utc_offset_minutes",
                format!("{utc_offset_minutes} is not a valid UTC offset"),
            )
        })?;
        Ok(Self { offset })
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// Manually advanced clock, cloned handles share one instant
#[derive(Debug, Clone)]
pub struct ManualClock {
    at: Arc<Mutex<DateTime<FixedOffset>>>,
}

impl ManualClock {
    pub fn new(at: DateTime<FixedOffset>) -> Self {
        Self {
            at: Arc::new(Mutex::new(at)),
        }
    }

    pub fn set(&self, at: DateTime<FixedOffset>) {
        *self.at.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut at = self.at.lock().unwrap_or_else(PoisonError::into_inner);
        *at += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.at.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
