//! Fixture gateway for the CRMS observation gateway protocol.
//!
//! A development stand-in for the external market-data system. It listens on
//! TCP, authenticates every envelope against a fixture book and answers from
//! canned data:
//!
//! - `FixtureBook`: accounts, known subjects and the retrieval grids to replay.
//! - `Dispatcher`: maps a decoded `Envelope` onto a `Reply`; service failures
//!   (denied access, unknown subjects, rejected cells) are data in the reply.
//! - `GatewayServer`: accept loop plus one thread per connection; the loop
//!   polls a crossbeam stop channel between accept attempts.
//! - `StoreLedger`: in-memory record of accepted store commands.
//!
//! The gateway computes nothing: no aggregation, currency conversion, period
//! resolution or layout transposition. A retrieval is answered only when the
//! fixture book holds a grid for exactly that query.
#![warn(missing_docs)]

pub mod handler;
pub mod model;
pub mod receiver;

pub use handler::Dispatcher;
pub use model::fixture::{Account, FixtureBook, RetrievalFixture};
pub use model::ledger::{StoreLedger, StoredBatch};
pub use receiver::{GatewayServer, ServerHandle};
