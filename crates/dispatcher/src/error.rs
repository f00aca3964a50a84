//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Queue full - record dropped
    #[error("queue full for sink '{sink_name}', {event} record #{total_tx} dropped")]
    QueueFull {
        sink_name: String,
        event: &'static str,
        total_tx: u64,
    },

    /// Sink write error (from contract)
    #[error("sink error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<DispatcherError> for contracts::ContractError {
    fn from(err: DispatcherError) -> Self {
        match err {
            DispatcherError::SinkCreation { name, message } => Self::SinkConnection {
                sink_name: name,
                message,
            },
            DispatcherError::QueueFull { sink_name, .. } => {
                Self::sink_write(sink_name, "queue full")
            }
            DispatcherError::Contract(inner) => inner,
            DispatcherError::Io(e) => Self::Io(e),
        }
    }
}
