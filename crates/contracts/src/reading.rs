//! Reading - a single temperature/humidity observation.

use chrono::{DateTime, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Sensor reading
///
/// Immutable value object produced from one reading line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Temperature (°C)
    pub temperature: f64,

    /// Relative humidity (%RH)
    pub humidity: f64,

    /// Normalized time of day in `[0, 1)`
    pub time_fraction: f64,

    /// Local capture time
    pub captured_at: DateTime<FixedOffset>,
}

impl Reading {
    /// Build a reading captured at `captured_at`
    pub fn new(temperature: f64, humidity: f64, captured_at: DateTime<FixedOffset>) -> Self {
        Self {
            temperature,
            humidity,
            time_fraction: time_of_day_fraction(&captured_at),
            captured_at,
        }
    }

    /// `(temperature, humidity)` pair
    pub fn values(&self) -> (f64, f64) {
        (self.temperature, self.humidity)
    }
}

/// Whole seconds since local midnight divided by the length of a day.
pub fn time_of_day_fraction(at: &DateTime<FixedOffset>) -> f64 {
    f64::from(at.num_seconds_from_midnight()) / SECONDS_PER_DAY
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_time_fraction_bounds() {
        let tz = FixedOffset::west_opt(8 * 3600).unwrap();
        let midnight = tz.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let noon = tz.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let last = tz.with_ymd_and_hms(2025, 3, 1, 23, 59, 59).unwrap();

        assert_eq!(time_of_day_fraction(&midnight), 0.0);
        assert_eq!(time_of_day_fraction(&noon), 0.5);
        assert!(time_of_day_fraction(&last) < 1.0);
    }

    #[test]
    fn test_time_fraction_uses_local_offset() {
        // 20:00 UTC is 12:00 at UTC-8
        let utc = FixedOffset::east_opt(0).unwrap();
        let at = utc.with_ymd_and_hms(2025, 3, 1, 20, 0, 0).unwrap();
        let local = at.with_timezone(&FixedOffset::west_opt(8 * 3600).unwrap());
        assert_eq!(time_of_day_fraction(&local), 0.5);
    }

    #[test]
    fn test_reading_new() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let at = tz.with_ymd_and_hms(2025, 3, 1, 6, 0, 0).unwrap();
        let reading = Reading::new(22.1, 48.3, at);
        assert_eq!(reading.values(), (22.1, 48.3));
        assert_eq!(reading.time_fraction, 0.25);
    }
}
