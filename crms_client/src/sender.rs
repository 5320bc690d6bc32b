//! Sending envelopes to the gateway and reading its replies.
//!
//! `Transport` is the seam between the `Gateway` and the wire: one blocking
//! round trip per call, no retries. `TcpTransport` keeps a single connection
//! open between calls, connects lazily and drops the connection after any
//! failure so the next call starts from a fresh socket. A kept connection the
//! gateway has closed in the meantime (idle timeout) is replaced before the
//! request is written.
use std::io::ErrorKind;
use std::net::{TcpStream, ToSocketAddrs};

use crms_common::codec::{WireCodec, read_frame, write_frame};
use crms_common::{Envelope, GatewayError, Reply, Result};
use log::{debug, info, warn};

use crate::config::ClientConfig;

/// Blocking request/response channel to a gateway.
pub trait Transport {
    /// Send `envelope` and wait for the matching reply.
    fn round_trip(&mut self, envelope: &Envelope) -> Result<Reply>;

    /// Release any open connection. The next round trip reconnects.
    fn close(&mut self) {}
}

/// Framed TCP transport.
pub struct TcpTransport {
    config: ClientConfig,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    /// Transport for `config`; no connection is made until the first round trip.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `true` while a connection is open.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn connect(&self) -> Result<TcpStream> {
        let mut last_error = None;
        for addr in self.config.address.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.config.connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.config.io_timeout))?;
                    stream.set_write_timeout(Some(self.config.io_timeout))?;
                    stream.set_nodelay(true)?;
                    info!("Connected to gateway at {}", addr);
                    return Ok(stream);
                }
                Err(e) => {
                    debug!("Connecting to {} failed: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }
        Err(match last_error {
            Some(e) => GatewayError::Io(e),
            None => GatewayError::Protocol(format!(
                "address '{}' did not resolve",
                self.config.address
            )),
        })
    }
}

/// `true` when the gateway closed the connection or left unread bytes on it.
///
/// Checked with a non-blocking peek while no request is in flight, so any
/// readable byte or EOF means the connection cannot carry the next exchange.
fn peer_has_closed(stream: &TcpStream) -> bool {
    if stream.set_nonblocking(true).is_err() {
        return true;
    }
    let mut buf = [0u8; 1];
    let unusable = match stream.peek(&mut buf) {
        Ok(_) => true,
        Err(e) => e.kind() != ErrorKind::WouldBlock,
    };
    unusable || stream.set_nonblocking(false).is_err()
}

fn exchange(stream: &mut TcpStream, codec: WireCodec, envelope: &Envelope) -> Result<Reply> {
    write_frame(stream, codec, envelope)?;
    let (_, reply) = read_frame(stream)?;
    Ok(reply)
}

impl Transport for TcpTransport {
    fn round_trip(&mut self, envelope: &Envelope) -> Result<Reply> {
        if self.stream.as_ref().is_some_and(peer_has_closed) {
            debug!("Gateway closed the idle connection, reconnecting");
            self.stream = None;
        }
        if self.stream.is_none() {
            let stream = self.connect()?;
            self.stream = Some(stream);
        }

        let result = match self.stream.as_mut() {
            Some(stream) => exchange(stream, self.config.codec, envelope),
            None => Err(GatewayError::Protocol(String::from(
                "no connection to the gateway",
            ))),
        };

        if let Err(e) = &result {
            warn!("Dropping gateway connection after error: {}", e);
            self.stream = None;
        }
        result
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            info!("Disconnected from gateway at {}", self.config.address);
        }
    }
}
