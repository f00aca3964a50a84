//! FileSink - appends records to a CSV flat file

use contracts::{ContractError, DataSink, EventRecord};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

/// Column layout of the flat-file log
pub const CSV_HEADER: [&str; 10] = [
    "Timestamp",
    "Time_n",
    "Event",
    "Actual_T",
    "Actual_H",
    "Pred_T",
    "Pred_H",
    "Error_T",
    "Error_H",
    "Total_TX",
];

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    pub path: PathBuf,
    /// Flush after every record instead of only on `flush`/`close`
    pub flush_each: bool,
}

impl FileSinkConfig {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./gateway_log.csv"));
        let flush_each = params
            .get("flush_each")
            .map_or(true, |v| v != "false");

        Self { path, flush_each }
    }
}

/// Sink that appends one CSV row per record
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    writer: Option<csv::Writer<File>>,
}

impl FileSink {
    /// Open (or create) the CSV file; the header is written only for a new or empty file.
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let needs_header = fs::metadata(&config.path).map_or(true, |m| m.len() == 0);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer.write_record(CSV_HEADER)?;
            writer.flush()?;
        }

        let name = name.into();
        debug!(sink = %name, path = %config.path.display(), needs_header, "FileSink opened");

        Ok(Self {
            name,
            config,
            writer: Some(writer),
        })
    }

    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        Self::new(name, FileSinkConfig::from_params(params))
    }

    fn write_row(&mut self, record: &EventRecord) -> Result<(), csv::Error> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(std::io::Error::other("sink closed").into());
        };
        writer.write_record([
            record.timestamp.clone(),
            record.time_n.to_string(),
            record.event.as_str().to_string(),
            optional(record.actual_t),
            optional(record.actual_h),
            fixed(record.pred_t),
            fixed(record.pred_h),
            optional(record.error_t),
            optional(record.error_h),
            record.total_tx.to_string(),
        ])?;
        if self.config.flush_each {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Value columns carry two decimals
fn fixed(value: f64) -> String {
    format!("{value:.2}")
}

fn optional(value: Option<f64>) -> String {
    value.map(fixed).unwrap_or_default()
}

impl DataSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, record),
        fields(sink = %self.name, total_tx = record.total_tx)
    )]
    async fn write(&mut self, record: &EventRecord) -> Result<(), ContractError> {
        self.write_row(record).map_err(|e| {
            error!(sink = %self.name, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        debug!(sink = %self.name, "FileSink closed");
        Ok(())
    }
}
