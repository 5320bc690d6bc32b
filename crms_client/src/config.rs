//! Client configuration.
use std::time::Duration;

use crms_common::codec::WireCodec;
use crms_common::net::default_gateway_addr;

/// Default time allowed to establish the TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default time allowed for a single read or write on the connection.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how the client talks to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Gateway address as `host:port`.
    pub address: String,
    /// Payload encoding of outgoing frames.
    pub codec: WireCodec,
    /// Limit for establishing the connection.
    pub connect_timeout: Duration,
    /// Limit for each read and write once connected.
    pub io_timeout: Duration,
}

impl ClientConfig {
    /// Configuration for `address` with default codec and timeouts.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Use `codec` for outgoing frames.
    pub fn with_codec(mut self, codec: WireCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Override the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Override the read/write timeout.
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: default_gateway_addr(),
            codec: WireCodec::Json,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }
}
