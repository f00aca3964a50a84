//! Connectors: open (and reopen) the link described by the configuration.

use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use contracts::{ContractError, TransportConfig, TransportConnector};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tracing::{info, instrument};

use crate::error::IngestionError;
use crate::framing::LineTransport;
use crate::metrics::LinkMetrics;

/// Byte stream usable as a sensor link
pub trait Duplex: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> Duplex for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Type-erased stream so serial and TCP links share one transport type
pub struct BoxedStream(Box<dyn Duplex>);

impl BoxedStream {
    pub fn new(stream: impl Duplex + 'static) -> Self {
        Self(Box::new(stream))
    }
}

impl std::fmt::Debug for BoxedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BoxedStream")
    }
}

impl AsyncRead for BoxedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut *self.0).poll_read(cx, buf)
    }
}

impl AsyncWrite for BoxedStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut *self.0).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut *self.0).poll_flush(cx)
    }

    fn poll_shutdown(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut *self.0).poll_shutdown(cx)
    }
}

/// Link opened by the configured connector
pub type Link = LineTransport<BoxedStream>;

/// Connector built from `[transport]`
#[derive(Debug, Clone)]
pub struct ConfiguredConnector {
    config: TransportConfig,
    max_line: usize,
    metrics: Arc<LinkMetrics>,
}

impl ConfiguredConnector {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            max_line: crate::framing::DEFAULT_MAX_LINE,
            metrics: Arc::new(LinkMetrics::new()),
        }
    }

    pub fn with_max_line(mut self, max_line: usize) -> Self {
        self.max_line = max_line;
        self
    }

    /// Counters accumulated over every link this connector opened
    pub fn metrics(&self) -> Arc<LinkMetrics> {
        self.metrics.clone()
    }

    async fn open(&self) -> Result<BoxedStream, IngestionError> {
        let endpoint = self.config.endpoint();
        match &self.config {
            TransportConfig::Tcp { addr } => {
                let stream = TcpStream::connect(addr.as_str())
                    .await
                    .map_err(|source| IngestionError::Open { endpoint, source })?;
                stream.set_nodelay(true).ok();
                Ok(BoxedStream::new(stream))
            }
            TransportConfig::Serial { path, baud_rate } => open_serial(path, *baud_rate, endpoint),
        }
    }
}

#[cfg(feature = "serial")]
fn open_serial(path: &str, baud_rate: u32, endpoint: String) -> Result<BoxedStream, IngestionError> {
    use tokio_serial::SerialPortBuilderExt;

    let port = tokio_serial::new(path, baud_rate)
        .open_native_async()
        .map_err(|e| IngestionError::Open {
            endpoint,
            source: std::io::Error::from(e),
        })?;
    Ok(BoxedStream::new(port))
}

#[cfg(not(feature = "serial"))]
fn open_serial(
    _path: &str,
    _baud_rate: u32,
    endpoint: String,
) -> Result<BoxedStream, IngestionError> {
    Err(IngestionError::Unsupported {
        endpoint,
        kind: "serial",
    })
}

impl TransportConnector for ConfiguredConnector {
    type Link = Link;

    fn describe(&self) -> String {
        self.config.endpoint()
    }

    #[instrument(name = "transport_connect", skip(self), fields(endpoint = %self.config.endpoint()))]
    async fn connect(&self) -> Result<Link, ContractError> {
        let stream = self.open().await?;
        info!("link opened");
        Ok(LineTransport::new(stream, self.config.endpoint())
            .with_max_line(self.max_line)
            .with_metrics(self.metrics.clone()))
    }
}

/// Connector handing out one pre-opened stream
///
/// For in-memory links (`tokio::io::duplex`) and tests; later connects fail.
#[derive(Debug)]
pub struct OnceConnector<S> {
    endpoint: String,
    stream: Mutex<Option<S>>,
}

impl<S> OnceConnector<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            stream: Mutex::new(Some(stream)),
        }
    }
}

impl<S> TransportConnector for OnceConnector<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    type Link = LineTransport<S>;

    fn describe(&self) -> String {
        self.endpoint.clone()
    }

    async fn connect(&self) -> Result<LineTransport<S>, ContractError> {
        let stream = self
            .stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| IngestionError::AlreadyConnected {
                endpoint: self.endpoint.clone(),
            })?;
        Ok(LineTransport::new(stream, self.endpoint.clone()))
    }
}
