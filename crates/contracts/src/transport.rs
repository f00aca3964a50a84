//! Transport traits - line-oriented link to the sensor node.

use std::time::Duration;

use crate::ContractError;

/// Newline-framed duplex link
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Human readable endpoint, e.g. `serial:///dev/ttyUSB0`
    fn describe(&self) -> &str;

    /// Wait up to `timeout` for one complete line (terminator stripped).
    ///
    /// Returns `Ok(None)` when nothing complete arrived in time. Partial
    /// input is kept for the next call.
    ///
    /// # Errors
    /// `TransportClosed` on EOF, `TransportIo` on read failure.
    async fn poll_line(&mut self, timeout: Duration) -> Result<Option<String>, ContractError>;

    /// Write `line` followed by a newline and flush.
    async fn send_line(&mut self, line: &str) -> Result<(), ContractError>;

    /// Release the underlying resource
    async fn close(&mut self) -> Result<(), ContractError>;
}

/// Opens transports, used again on reconnect
#[trait_variant::make(TransportConnector: Send)]
pub trait LocalTransportConnector {
    type Link: Transport;

    fn describe(&self) -> String;

    /// # Errors
    /// `TransportOpen` when the endpoint cannot be reached.
    async fn connect(&self) -> Result<Self::Link, ContractError>;
}
