//! # Ingestion
//!
//! Sensor link layer.
//!
//! Responsibilities:
//! - Newline framing over serial, TCP or in-memory byte streams
//! - Open and reopen links from the `[transport]` configuration
//! - Link counters (lines, bytes, oversized drops)
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::{Transport, TransportConnector};
//! use ingestion::ConfiguredConnector;
//!
//! let connector = ConfiguredConnector::new(blueprint.transport.clone());
//! let mut link = connector.connect().await?;
//! while let Some(line) = link.poll_line(Duration::from_secs(1)).await? {
//!     // Classify line
//! }
//! ```
//!
//! ## In-memory link
//!
//! ```ignore
//! use ingestion::OnceConnector;
//!
//! let (sensor, gateway) = tokio::io::duplex(1024);
//! let connector = OnceConnector::new(gateway, "mem://sensor");
//! ```

mod connector;
mod error;
mod framing;
mod metrics;

// Re-exports
pub use connector::{BoxedStream, ConfiguredConnector, Duplex, Link, OnceConnector};
pub use error::{IngestionError, Result};
pub use framing::{LineTransport, DEFAULT_MAX_LINE};
pub use metrics::{LinkMetrics, LinkSnapshot};
