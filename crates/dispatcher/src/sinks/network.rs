//! NetworkSink - UDP fire-and-forget publication of event records

use contracts::{ContractError, DataSink, EventRecord};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, error, instrument, warn};

/// Datagram encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkFormat {
    /// JSON object, one per datagram
    #[default]
    Json,
    Bincode,
}

/// Configuration for NetworkSink
#[derive(Debug, Clone)]
pub struct NetworkSinkConfig {
    /// Subscriber address
    pub addr: SocketAddr,
    pub format: NetworkFormat,
    /// Larger payloads are dropped, not fragmented
    pub max_packet_size: usize,
}

impl NetworkSinkConfig {
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| "missing 'addr' parameter".to_string())?;

        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e| format!("invalid address '{}': {}", addr_str, e))?;

        let format = match params.get("format").map(String::as_str) {
            Some("bincode") => NetworkFormat::Bincode,
            Some("json") | None => NetworkFormat::Json,
            Some(other) => return Err(format!("unknown format '{}'", other)),
        };

        let max_packet_size = params
            .get("max_packet_size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(65000);

        Ok(Self {
            addr,
            format,
            max_packet_size,
        })
    }
}

/// Sink that sends each record as one UDP datagram
pub struct NetworkSink {
    name: String,
    config: NetworkSinkConfig,
    socket: Option<UdpSocket>,
    sent: u64,
}

impl NetworkSink {
    #[instrument(name = "network_sink_new", skip(name, config), fields(addr = %config.addr))]
    pub async fn new(name: impl Into<String>, config: NetworkSinkConfig) -> std::io::Result<Self> {
        let name = name.into();
        let bind = if config.addr.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind).await?;
        socket.connect(&config.addr).await?;

        debug!(sink = %name, target = %config.addr, "NetworkSink connected");

        Ok(Self {
            name,
            config,
            socket: Some(socket),
            sent: 0,
        })
    }

    #[instrument(name = "network_sink_from_params", skip(name, params))]
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = NetworkSinkConfig::from_params(params)
            .map_err(|e| ContractError::config_validation(format!("sinks.{name}.params"), e))?;

        Self::new(name.clone(), config)
            .await
            .map_err(|e| ContractError::SinkConnection {
                sink_name: name,
                message: e.to_string(),
            })
    }

    /// Datagrams handed to the socket so far
    pub fn sent(&self) -> u64 {
        self.sent
    }

    fn encode(&self, record: &EventRecord) -> Result<Vec<u8>, ContractError> {
        let encoded = match self.config.format {
            NetworkFormat::Json => serde_json::to_vec(record).map_err(|e| e.to_string()),
            NetworkFormat::Bincode => bincode::serialize(record).map_err(|e| e.to_string()),
        };
        encoded.map_err(|e| ContractError::sink_write(&self.name, e))
    }
}

impl DataSink for NetworkSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "network_sink_write",
        skip(self, record),
        fields(sink = %self.name, total_tx = record.total_tx)
    )]
    async fn write(&mut self, record: &EventRecord) -> Result<(), ContractError> {
        let data = self.encode(record)?;
        if data.len() > self.config.max_packet_size {
            warn!(
                sink = %self.name,
                size = data.len(),
                max = self.config.max_packet_size,
                "Datagram too large, dropped"
            );
            return Ok(());
        }

        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| ContractError::sink_write(&self.name, "socket not connected"))?;

        // Best effort: no subscriber is not an error
        match socket.send(&data).await {
            Ok(bytes) => {
                self.sent += 1;
                debug!(sink = %self.name, bytes, "Sent");
            }
            Err(e) => error!(sink = %self.name, error = %e, "UDP send failed"),
        }
        Ok(())
    }

    #[instrument(name = "network_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "network_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        debug!(sink = %self.name, sent = self.sent, "NetworkSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::tests::record;

    #[test]
    fn test_network_sink_config_parsing() {
        let mut params = HashMap::new();
        params.insert("addr".to_string(), "127.0.0.1:9999".to_string());
        params.insert("format".to_string(), "bincode".to_string());

        let config = NetworkSinkConfig::from_params(&params).unwrap();
        assert_eq!(config.addr.port(), 9999);
        assert_eq!(config.format, NetworkFormat::Bincode);
        assert_eq!(config.max_packet_size, 65000);
    }

    #[test]
    fn test_config_rejects_unknown_format() {
        let mut params = HashMap::new();
        params.insert("addr".to_string(), "127.0.0.1:9999".to_string());
        params.insert("format".to_string(), "xml".to_string());
        assert!(NetworkSinkConfig::from_params(&params).is_err());
        assert!(NetworkSinkConfig::from_params(&HashMap::new()).is_err());
    }

    #[tokio::test]
    async fn test_json_datagram_reaches_subscriber() {
        let subscriber = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = NetworkSinkConfig {
            addr: subscriber.local_addr().unwrap(),
            format: NetworkFormat::Json,
            max_packet_size: 65000,
        };
        let mut sink = NetworkSink::new("udp", config).await.unwrap();

        sink.write(&record(4)).await.unwrap();

        let mut buf = [0u8; 2048];
        let len = subscriber.recv(&mut buf).await.unwrap();
        let received: EventRecord = serde_json::from_slice(&buf[..len]).unwrap();
        assert_eq!(received, record(4));
        assert_eq!(sink.sent(), 1);
    }

    #[tokio::test]
    async fn test_oversized_datagram_dropped() {
        let config = NetworkSinkConfig {
            addr: "127.0.0.1:19998".parse().unwrap(),
            format: NetworkFormat::Json,
            max_packet_size: 8,
        };
        let mut sink = NetworkSink::new("udp", config).await.unwrap();
        assert!(sink.write(&record(1)).await.is_ok());
        assert_eq!(sink.sent(), 0);
    }

    #[tokio::test]
    async fn test_write_after_close_fails() {
        let config = NetworkSinkConfig {
            addr: "127.0.0.1:19997".parse().unwrap(),
            format: NetworkFormat::Bincode,
            max_packet_size: 65000,
        };
        let mut sink = NetworkSink::new("udp", config).await.unwrap();
        sink.close().await.unwrap();
        assert!(sink.write(&record(1)).await.is_err());
    }
}
