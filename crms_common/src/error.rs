//! Error types shared between the gateway client and the fixture server.
//!
//! The `GatewayError` enum unifies local failure cases: I/O, frame encoding,
//! protocol violations and malformed commands. Failures reported by the
//! external system itself (unavailable data, rejected cells) are not errors;
//! they travel back as response status fields.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type shared by client and server.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// I/O error originating from sockets or files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The peer sent something that does not follow the frame protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A frame announced a payload larger than the accepted maximum.
    #[error("Frame too large: {size} bytes exceeds max of {max}")]
    FrameTooLarge {
        /// Announced payload size.
        size: usize,
        /// Largest accepted payload size.
        max: usize,
    },

    /// A value grid is not rectangular or does not fit the command axes.
    #[error("Invalid value grid: {0}")]
    InvalidGrid(String),

    /// A command failed local validation before being submitted.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// A fixture book could not be read or understood.
    #[error("Fixture error: {0}")]
    Fixture(String),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Failure while decoding with `bincode` (invalid or truncated payloads, etc.).
    #[error("Bincode decode error: {0}")]
    BincodeDecode(#[from] bincode::error::DecodeError),

    /// Failure while encoding with `bincode`.
    #[error("Bincode encode error: {0}")]
    BincodeEncode(#[from] bincode::error::EncodeError),

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),
}

impl<T> From<PoisonError<T>> for GatewayError {
    fn from(err: PoisonError<T>) -> Self {
        GatewayError::MutexLock(err.to_string())
    }
}
