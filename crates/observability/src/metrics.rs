//! Gateway metrics: Prometheus recorders and in-memory transmission statistics.

use contracts::TransmissionEvent;
use metrics::{counter, gauge};

/// Record one protocol event
///
/// # Example
/// ```ignore
/// use observability::metrics::record_event;
///
/// record_event(&event);
/// ```
pub fn record_event(event: &TransmissionEvent) {
    counter!("aoii_events_total", "kind" => event.kind_label()).increment(1);

    match event {
        TransmissionEvent::Rx {
            reading,
            error,
            sequence,
            ..
        } => {
            counter!("aoii_readings_total").increment(1);
            gauge!("aoii_sequence").set(*sequence as f64);
            gauge!("aoii_last_actual_temperature").set(reading.temperature);
            gauge!("aoii_last_actual_humidity").set(reading.humidity);
            gauge!("aoii_last_error_temperature").set(error.0);
            gauge!("aoii_last_error_humidity").set(error.1);
            gauge!("aoii_last_received_timestamp").set(reading.captured_at.timestamp() as f64);
        }
        TransmissionEvent::Est { predicted, .. } => {
            gauge!("aoii_estimate_temperature").set(predicted.0);
            gauge!("aoii_estimate_humidity").set(predicted.1);
        }
        TransmissionEvent::SyncPing { .. } => {
            counter!("aoii_sync_pings_total").increment(1);
        }
    }
}

/// Record a discarded (malformed) line
pub fn record_line_discarded(reason: &'static str) {
    counter!("aoii_lines_discarded_total", "reason" => reason).increment(1);
}

/// Record a transport reconnect
pub fn record_reconnect(endpoint: &str) {
    counter!("aoii_transport_reconnects_total", "endpoint" => endpoint.to_string()).increment(1);
}

/// Record an event the protocol loop could not hand to the dispatcher
pub fn record_event_dropped(reason: &'static str) {
    counter!("aoii_events_dropped_total", "reason" => reason).increment(1);
}

/// Record sink dispatch outcome
pub fn record_record_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "aoii_records_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Publish the running error and mean gauges
pub fn record_transmission_summary(summary: &TransmissionSummary) {
    gauge!("aoii_mae_temperature").set(summary.abs_error_temperature.mean);
    gauge!("aoii_mae_humidity").set(summary.abs_error_humidity.mean);
    gauge!("aoii_avg_temperature").set(summary.actual_temperature.mean);
    gauge!("aoii_avg_humidity").set(summary.actual_humidity.mean);
}

/// Transmission statistics aggregator
///
/// Aggregates in memory for the end-of-run summary and the MAE gauges.
#[derive(Debug, Clone, Default)]
pub struct TransmissionStats {
    pub readings: u64,
    pub estimates: u64,
    pub sync_pings: u64,

    /// Highest sequence observed
    pub last_sequence: u64,

    pub abs_error_temperature: RunningStats,
    pub abs_error_humidity: RunningStats,
    pub actual_temperature: RunningStats,
    pub actual_humidity: RunningStats,
}

impl TransmissionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the aggregate
    pub fn update(&mut self, event: &TransmissionEvent) {
        match event {
            TransmissionEvent::Rx {
                reading,
                error,
                sequence,
                ..
            } => {
                self.readings += 1;
                self.last_sequence = self.last_sequence.max(*sequence);
                self.abs_error_temperature.push(error.0);
                self.abs_error_humidity.push(error.1);
                self.actual_temperature.push(reading.temperature);
                self.actual_humidity.push(reading.humidity);
            }
            TransmissionEvent::Est { .. } => self.estimates += 1,
            TransmissionEvent::SyncPing { .. } => self.sync_pings += 1,
        }
    }

    pub fn summary(&self) -> TransmissionSummary {
        TransmissionSummary {
            readings: self.readings,
            estimates: self.estimates,
            sync_pings: self.sync_pings,
            last_sequence: self.last_sequence,
            abs_error_temperature: StatsSummary::from(&self.abs_error_temperature),
            abs_error_humidity: StatsSummary::from(&self.abs_error_humidity),
            actual_temperature: StatsSummary::from(&self.actual_temperature),
            actual_humidity: StatsSummary::from(&self.actual_humidity),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Transmission summary
#[derive(Debug, Clone, Default)]
pub struct TransmissionSummary {
    pub readings: u64,
    pub estimates: u64,
    pub sync_pings: u64,
    pub last_sequence: u64,
    pub abs_error_temperature: StatsSummary,
    pub abs_error_humidity: StatsSummary,
    pub actual_temperature: StatsSummary,
    pub actual_humidity: StatsSummary,
}

impl std::fmt::Display for TransmissionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Transmission Summary ===")?;
        writeln!(f, "Readings (RX): {}", self.readings)?;
        writeln!(f, "Estimates (EST): {}", self.estimates)?;
        writeln!(f, "Sync pings: {}", self.sync_pings)?;
        writeln!(f, "Total TX: {}", self.last_sequence)?;
        writeln!(f, "|Error| temperature (C): {}", self.abs_error_temperature)?;
        writeln!(f, "|Error| humidity (%RH): {}", self.abs_error_humidity)?;
        writeln!(f, "Actual temperature (C): {}", self.actual_temperature)?;
        writeln!(f, "Actual humidity (%RH): {}", self.actual_humidity)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.2}, max={:.2}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
