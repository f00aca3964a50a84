//! Layered error definitions
//!
//! Categorized by source: config / model / transport / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Model parameters with inconsistent dimensions or unusable values
    #[error("model shape error at '{field}': {message}")]
    ModelShape { field: String, message: String },

    // ===== Transport Errors =====
    /// Transport could not be opened
    #[error("transport '{endpoint}' open error: {message}")]
    TransportOpen { endpoint: String, message: String },

    /// Read or write failure on an open transport
    #[error("transport '{endpoint}' io error: {message}")]
    TransportIo { endpoint: String, message: String },

    /// Peer closed the transport (EOF)
    #[error("transport '{endpoint}' closed")]
    TransportClosed { endpoint: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create model shape error
    pub fn model_shape(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModelShape {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create transport open error
    pub fn transport_open(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransportOpen {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create transport io error
    pub fn transport_io(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransportIo {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Whether the error belongs to the configuration layer (fatal at load)
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::ConfigParse { .. } | Self::ConfigValidation { .. } | Self::ModelShape { .. }
        )
    }

    /// Whether the error belongs to the transport layer (recoverable by reconnect)
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::TransportOpen { .. } | Self::TransportIo { .. } | Self::TransportClosed { .. }
        )
    }
}
