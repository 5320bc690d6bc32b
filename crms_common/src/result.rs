//! Result type alias shared across the workspace.
//!
//! This module defines a convenient alias that defaults the error type to the
//! common `GatewayError`, so functions can simply return `Result<T>`.
use crate::error::GatewayError;

/// Workspace-wide `Result` alias with `GatewayError` as the default error.
pub type Result<T, E = GatewayError> = std::result::Result<T, E>;
