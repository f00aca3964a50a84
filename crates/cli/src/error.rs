//! Error types for CLI operations.

use std::path::Path;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Transport override rejected
    #[error("Invalid transport override: {message}")]
    TransportOverride { message: String },

    /// Dataset row that cannot be replayed
    #[error("Dataset {path}, row {row}: {message}")]
    DatasetRow {
        path: String,
        row: u64,
        message: String,
    },

    /// Gateway execution error
    #[error("Gateway execution failed: {message}")]
    PipelineExecution { message: String },
}

impl CliError {
    pub fn config_not_found(path: &Path) -> Self {
        Self::ConfigNotFound {
            path: path.display().to_string(),
        }
    }

    pub fn transport_override(message: impl Into<String>) -> Self {
        Self::TransportOverride {
            message: message.into(),
        }
    }

    pub fn dataset_row(path: &Path, row: u64, message: impl Into<String>) -> Self {
        Self::DatasetRow {
            path: path.display().to_string(),
            row,
            message: message.into(),
        }
    }

    pub fn pipeline_execution(message: impl Into<String>) -> Self {
        Self::PipelineExecution {
            message: message.into(),
        }
    }
}
