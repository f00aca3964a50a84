//! Gateway orchestrator: wires transport, protocol runner and dispatcher.

use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{GatewayBlueprint, TransmissionEvent};
use ingestion::ConfiguredConnector;
use predictor::Predictor;
use sync_engine::{Clock, ProtocolRunner, RunnerSettings, SyncEngine, SystemClock};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use super::PipelineStats;
use crate::error::CliError;

/// Upper bound on draining sinks after the protocol loop stops
const DISPATCHER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Gateway run configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub blueprint: GatewayBlueprint,

    /// Stop after this many RX events (None = unlimited)
    pub max_rx: Option<u64>,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main gateway orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, the timeout elapses, the RX limit is
    /// reached or the transport ends. Sinks are drained before returning.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;
        let protocol = &blueprint.protocol;

        if let Some(port) = self.config.metrics_port {
            observability::install_prometheus(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Predictor
        let model = config_loader::ConfigLoader::effective_model(blueprint);
        let predictor = Predictor::from_spec(&model).context("Invalid model parameters")?;
        info!(
            hidden = predictor.params().hidden_dim(),
            seed_t = predictor.last_prediction().0,
            seed_h = predictor.last_prediction().1,
            "Predictor ready"
        );

        // Dispatcher
        let (event_tx, event_rx) = mpsc::channel::<TransmissionEvent>(protocol.event_queue);
        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - event records will only be counted");
        }
        let dispatcher = dispatcher::create_dispatcher(blueprint.sinks.clone(), event_rx)
            .await
            .context("Failed to create dispatcher")?;
        let active_sinks = blueprint.sinks.len();
        let dispatcher_handle = dispatcher.spawn();
        info!(active_sinks, "Dispatcher started");

        // Protocol runner
        let clock = SystemClock::new(protocol.utc_offset_minutes)?;
        let engine = SyncEngine::new(predictor, protocol, clock.now());
        let connector = ConfiguredConnector::new(blueprint.transport.clone());
        let link_metrics = connector.metrics();
        let settings = RunnerSettings::from_protocol(protocol).with_max_rx(self.config.max_rx);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            endpoint = %blueprint.transport.endpoint(),
            max_rx = ?self.config.max_rx,
            "Gateway running"
        );
        let runner = ProtocolRunner::new(connector, clock, engine, event_tx, shutdown_rx, settings);
        let mut runner_handle = tokio::spawn(runner.run());

        let timeout = async {
            match self.config.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };

        let joined = tokio::select! {
            joined = &mut runner_handle => Some(joined),
            _ = shutdown => {
                warn!("Received shutdown signal, stopping gateway...");
                None
            }
            _ = timeout => {
                warn!(timeout = ?self.config.timeout, "Gateway timed out");
                None
            }
        };
        let joined = match joined {
            Some(joined) => joined,
            None => {
                let _ = shutdown_tx.send(true);
                runner_handle.await
            }
        };

        // The runner owned the event sender; the dispatcher now drains and stops
        info!("Shutting down gateway...");
        let report = joined
            .map_err(|e| CliError::pipeline_execution(format!("protocol task failed: {e}")))?
            .context("Protocol loop failed")?;

        let dispatch = match tokio::time::timeout(DISPATCHER_DRAIN_TIMEOUT, dispatcher_handle).await
        {
            Ok(Ok(summary)) => summary,
            Ok(Err(e)) => {
                warn!(error = %e, "Dispatcher task failed");
                Default::default()
            }
            Err(_) => {
                warn!("Dispatcher did not drain in time");
                Default::default()
            }
        };

        let stats = PipelineStats {
            report,
            dispatch,
            link: link_metrics.snapshot(),
            active_sinks,
            duration: start_time.elapsed(),
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            sequence = stats.report.sequence,
            stop_reason = ?stats.report.stop_reason,
            "Gateway shutdown complete"
        );

        Ok(stats)
    }
}
