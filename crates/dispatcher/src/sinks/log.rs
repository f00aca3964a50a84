//! LogSink - one tracing line per record

use contracts::{ContractError, DataSink, EventRecord};
use tracing::{info, instrument};

/// Sink that logs record summaries
pub struct LogSink {
    name: String,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_record(&self, record: &EventRecord) {
        info!(
            sink = %self.name,
            event = record.event.as_str(),
            timestamp = %record.timestamp,
            time_n = record.time_n,
            actual_t = ?record.actual_t,
            actual_h = ?record.actual_h,
            pred_t = record.pred_t,
            pred_h = record.pred_h,
            total_tx = record.total_tx,
            "EventRecord"
        );
    }
}

impl DataSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, record),
        fields(sink = %self.name, total_tx = record.total_tx)
    )]
    async fn write(&mut self, record: &EventRecord) -> Result<(), ContractError> {
        self.log_record(record);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
