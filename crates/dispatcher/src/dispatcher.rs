//! Dispatcher - converts protocol events and fans records out to sinks

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{EventKind, EventRecord, SinkConfig, SinkType, TransmissionEvent};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{FileSink, LogSink, NetworkSink};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub sinks: Vec<SinkConfig>,
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    input_rx: mpsc::Receiver<TransmissionEvent>,
}

impl DispatcherBuilder {
    pub fn new(config: DispatcherConfig, input_rx: mpsc::Receiver<TransmissionEvent>) -> Self {
        Self { config, input_rx }
    }

    /// Open every sink and start its worker
    #[instrument(name = "dispatcher_builder_build", skip(self))]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let handles = Self::initialize_handles(&self.config).await?;
        Ok(Dispatcher::with_handles(handles, self.input_rx))
    }

    #[instrument(
        name = "dispatcher_initialize_handles",
        skip(config),
        fields(sink_count = config.sinks.len())
    )]
    async fn initialize_handles(
        config: &DispatcherConfig,
    ) -> Result<Vec<SinkHandle>, DispatcherError> {
        let mut handles = Vec::with_capacity(config.sinks.len());
        for sink_config in &config.sinks {
            match create_sink_handle(sink_config).await {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // Stop the workers already started before bailing out
                    for handle in handles {
                        handle.shutdown().await;
                    }
                    return Err(e);
                }
            }
        }
        Ok(handles)
    }
}

#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
async fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::new(&config.name);
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::Network => {
            let sink = NetworkSink::from_params(&config.name, &config.params)
                .await
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
    }
}

/// Counts of what the dispatcher consumed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchSummary {
    pub rx: u64,
    pub est: u64,
    /// Sync pings, counted but never recorded
    pub pings: u64,
    pub sinks: Vec<(String, MetricsSnapshot)>,
}

impl DispatchSummary {
    pub fn records(&self) -> u64 {
        self.rx + self.est
    }
}

/// Fans out event records to sinks
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: mpsc::Receiver<TransmissionEvent>,
    summary: DispatchSummary,
}

impl Dispatcher {
    /// Dispatcher over already running sink handles
    pub fn with_handles(
        handles: Vec<SinkHandle>,
        input_rx: mpsc::Receiver<TransmissionEvent>,
    ) -> Self {
        Self {
            handles,
            input_rx,
            summary: DispatchSummary::default(),
        }
    }

    /// Metrics of every sink
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Consume events until the input channel closes, then drain every sink.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) -> DispatchSummary {
        info!(sinks = self.handles.len(), "Dispatcher started");

        while let Some(event) = self.input_rx.recv().await {
            self.dispatch_event(&event);

            let records = self.summary.records();
            if records > 0 && records.is_multiple_of(100) {
                debug!(records, "Dispatcher progress");
            }
        }

        info!(
            rx = self.summary.rx,
            est = self.summary.est,
            pings = self.summary.pings,
            "Dispatcher input closed, shutting down"
        );

        let mut summary = self.summary;
        for handle in self.handles {
            let name = handle.name().to_string();
            let metrics = std::sync::Arc::clone(handle.metrics());
            handle.shutdown().await;
            summary.sinks.push((name, metrics.snapshot()));
        }

        info!("Dispatcher shutdown complete");
        summary
    }

    /// Run on a background task
    pub fn spawn(self) -> JoinHandle<DispatchSummary> {
        tokio::spawn(self.run())
    }

    fn dispatch_event(&mut self, event: &TransmissionEvent) {
        let Some(record) = EventRecord::from_event(event) else {
            self.summary.pings += 1;
            debug!(timestamp = %event.timestamp(), "sync ping, nothing to record");
            return;
        };

        match record.event {
            EventKind::Rx => self.summary.rx += 1,
            EventKind::Est => self.summary.est += 1,
        }

        for handle in &self.handles {
            handle.try_send(record.clone());
        }
    }
}

/// Build a dispatcher straight from sink configs
#[instrument(name = "dispatcher_create", skip(sink_configs, input_rx))]
pub async fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    input_rx: mpsc::Receiver<TransmissionEvent>,
) -> Result<Dispatcher, DispatcherError> {
    let config = DispatcherConfig {
        sinks: sink_configs,
    };
    DispatcherBuilder::new(config, input_rx).build().await
}
