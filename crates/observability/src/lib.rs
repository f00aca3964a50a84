//! # Observability
//!
//! Tracing initialisation and Prometheus metrics for the gateway.
//!
//! ## Features
//!
//! - Tracing initialisation (JSON / Pretty / Compact)
//! - Prometheus exporter
//! - Transmission metrics and in-memory statistics
//!
//! ## Example
//!
//! ```ignore
//! observability::init_tracing(LogFormat::Compact, "info")?;
//! observability::install_prometheus(9000)?;
//!
//! observability::record_event(&event);
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

// Re-exports
pub use crate::metrics::{
    record_event, record_event_dropped, record_line_discarded, record_reconnect,
    record_record_dispatched, record_transmission_summary, RunningStats, StatsSummary,
    TransmissionStats, TransmissionSummary,
};

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON, one object per event
    Json,
    /// Multi-line, human readable
    Pretty,
    /// Single line
    #[default]
    Compact,
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_level`.
///
/// # Errors
/// A global subscriber is already installed.
pub fn init_tracing(format: LogFormat, default_level: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::debug!(?format, "tracing initialized");
    Ok(())
}

/// Serve gateway metrics for Prometheus on `0.0.0.0:<port>`
///
/// # Errors
/// The port cannot be bound or a recorder is already installed.
pub fn install_prometheus(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to install Prometheus exporter on port {port}"))?;

    tracing::info!(port, "Prometheus metrics endpoint listening");
    Ok(())
}
