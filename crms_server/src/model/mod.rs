//! Domain models of the fixture gateway.
//!
//! This module groups the state the gateway answers from:
//! - `fixture`: the fixture book: accounts, known subjects and canned retrieval grids.
//! - `ledger`: in-memory record of store commands the gateway accepted.

pub mod fixture;
pub mod ledger;
