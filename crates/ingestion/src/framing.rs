//! Newline framing over any async byte stream.

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use contracts::{ContractError, Transport};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::error::IngestionError;
use crate::metrics::LinkMetrics;

/// Default upper bound on one line, terminator excluded
pub const DEFAULT_MAX_LINE: usize = 256;

const READ_CHUNK: usize = 512;

/// Line-oriented transport over a duplex byte stream
///
/// Bytes read before a poll times out stay buffered, so a line split
/// across polls is never lost.
#[derive(Debug)]
pub struct LineTransport<S> {
    stream: S,
    buffer: BytesMut,
    endpoint: String,
    max_line: usize,
    metrics: Arc<LinkMetrics>,
}

impl<S> LineTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, endpoint: impl Into<String>) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            endpoint: endpoint.into(),
            max_line: DEFAULT_MAX_LINE,
            metrics: Arc::new(LinkMetrics::new()),
        }
    }

    pub fn with_max_line(mut self, max_line: usize) -> Self {
        self.max_line = max_line.max(1);
        self
    }

    /// Share counters with other links (e.g. across reconnects)
    pub fn with_metrics(mut self, metrics: Arc<LinkMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> Arc<LinkMetrics> {
        self.metrics.clone()
    }

    /// Split one complete line off the buffer
    fn take_line(&mut self) -> Option<String> {
        let pos = self.buffer.iter().position(|b| *b == b'\n')?;
        let raw = self.buffer.split_to(pos + 1);
        let mut line = &raw[..pos];
        if let [head @ .., b'\r'] = line {
            line = head;
        }
        self.metrics.record_line();
        Some(String::from_utf8_lossy(line).into_owned())
    }

    /// Drop an unterminated run that exceeds the limit
    fn enforce_limit(&mut self) {
        if self.buffer.len() > self.max_line {
            warn!(
                endpoint = %self.endpoint,
                len = self.buffer.len(),
                limit = self.max_line,
                "line exceeds limit, discarded"
            );
            self.buffer.clear();
            self.metrics.record_oversized();
        }
    }
}

impl<S> Transport for LineTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn describe(&self) -> &str {
        &self.endpoint
    }

    async fn poll_line(&mut self, timeout: Duration) -> Result<Option<String>, ContractError> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }
            self.enforce_limit();

            self.buffer.reserve(READ_CHUNK);
            match timeout_at(deadline, self.stream.read_buf(&mut self.buffer)).await {
                Err(_) => return Ok(None),
                Ok(Ok(0)) => {
                    debug!(endpoint = %self.endpoint, "eof");
                    return Err(IngestionError::Closed {
                        endpoint: self.endpoint.clone(),
                    }
                    .into());
                }
                Ok(Ok(n)) => self.metrics.record_bytes(n),
                Ok(Err(source)) => {
                    return Err(IngestionError::Read {
                        endpoint: self.endpoint.clone(),
                        source,
                    }
                    .into())
                }
            }
        }
    }

    async fn send_line(&mut self, line: &str) -> Result<(), ContractError> {
        let mut frame = Vec::with_capacity(line.len() + 1);
        frame.extend_from_slice(line.as_bytes());
        frame.push(b'\n');

        let written = async {
            self.stream.write_all(&frame).await?;
            self.stream.flush().await
        }
        .await;

        written.map_err(|source| IngestionError::Write {
            endpoint: self.endpoint.clone(),
            source,
        })?;
        self.metrics.record_sent();
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.stream
            .shutdown()
            .await
            .map_err(|source| IngestionError::Write {
                endpoint: self.endpoint.clone(),
                source,
            })?;
        Ok(())
    }
}
