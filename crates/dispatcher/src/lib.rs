//! # Dispatcher
//!
//! Event fan-out stage of the gateway.
//!
//! Responsibilities:
//! - Consume `TransmissionEvent`s from the protocol loop
//! - Convert RX / EST events into `EventRecord`s (sync pings are counted only)
//! - Fan out to every sink through an isolated queue, so a slow sink never
//!   blocks the protocol loop

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{DataSink, EventRecord, TransmissionEvent};
pub use dispatcher::{
    create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig, DispatchSummary,
};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{FileSink, LogSink, NetworkSink};
