//!
//! Common types and utilities shared by the gateway client and the fixture gateway.
//!
//! This crate aggregates:
//! - `error`: unified error type `GatewayError` used across the workspace.
//! - `result`: handy `Result<T, GatewayError>` alias.
//! - `grid`: rectangular 2-D value grids with header helpers.
//! - `layout`: grid layouts and the axis arithmetic behind them.
//! - `observations`: retrieve/store commands and their responses.
//! - `command`: envelopes and replies exchanged with the gateway.
//! - `codec`: length-prefixed JSON/bincode frames.
//! - `net`: networking constants and small helpers.
#![warn(missing_docs)]
pub mod error;
pub mod result;
pub mod grid;
pub mod layout;
pub mod observations;
pub mod command;
pub mod codec;
pub mod net;

pub use error::GatewayError;
pub use result::Result;
pub use command::{Credentials, Envelope, Reply, Request};
pub use grid::ValueGrid;
pub use layout::{Axis, AxisSet, Observations2DLayout};
pub use observations::{
    AxisSelection, CellError, RetrieveObservations2DCommand, RetrieveObservations2DResponse,
    RetrieveResponseStatus, StoreObservations2DCommand, StoreObservations2DResponse,
};
