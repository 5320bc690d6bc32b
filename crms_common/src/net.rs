//! Shared networking constants and helpers used by client and server.

/// Default TCP port of the gateway command channel.
pub const GATEWAY_PORT: u16 = 7878;

/// Loopback host used by the client when nothing else is configured.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Helper to format a host and port like "host:port".
pub fn addr(host: &str, port: u16) -> String {
    format!("{}:{}", host, port)
}

/// Default gateway address (`127.0.0.1:7878`).
pub fn default_gateway_addr() -> String {
    addr(DEFAULT_HOST, GATEWAY_PORT)
}
