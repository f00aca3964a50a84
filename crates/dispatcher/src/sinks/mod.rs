//! Sink implementations: tracing log, CSV flat file and UDP datagrams.

mod file;
mod log;
mod network;

pub use self::file::{FileSink, FileSinkConfig, CSV_HEADER};
pub use self::log::LogSink;
pub use self::network::{NetworkFormat, NetworkSink, NetworkSinkConfig};
