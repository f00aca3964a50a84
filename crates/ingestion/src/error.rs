//! Ingestion error types

use contracts::ContractError;
use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Endpoint could not be opened
    #[error("failed to open {endpoint}: {source}")]
    Open {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// Read failure
    #[error("read error on {endpoint}: {source}")]
    Read {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// Write failure
    #[error("write error on {endpoint}: {source}")]
    Write {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// Peer closed the stream
    #[error("{endpoint} closed")]
    Closed { endpoint: String },

    /// Transport kind not compiled in
    #[error("{endpoint}: {kind} transport not enabled in this build")]
    Unsupported { endpoint: String, kind: &'static str },

    /// One-shot connector already used
    #[error("{endpoint}: stream already taken")]
    AlreadyConnected { endpoint: String },
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;

impl From<IngestionError> for ContractError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::Open { endpoint, source } => {
                ContractError::transport_open(endpoint, source.to_string())
            }
            IngestionError::Read { endpoint, source } | IngestionError::Write { endpoint, source } => {
                ContractError::transport_io(endpoint, source.to_string())
            }
            IngestionError::Closed { endpoint } => ContractError::TransportClosed { endpoint },
            other @ (IngestionError::Unsupported { .. }
            | IngestionError::AlreadyConnected { .. }) => {
                ContractError::transport_open(other.endpoint(), other.to_string())
            }
        }
    }
}

impl IngestionError {
    /// Endpoint the error refers to
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Open { endpoint, .. }
            | Self::Read { endpoint, .. }
            | Self::Write { endpoint, .. }
            | Self::Closed { endpoint }
            | Self::Unsupported { endpoint, .. }
            | Self::AlreadyConnected { endpoint } => endpoint,
        }
    }
}
