//! Protocol messages exchanged between the gateway client and the gateway.
//!
//! Every request travels inside an `Envelope` that carries the session
//! credentials, so the gateway can authenticate each call independently.
//! Anonymous envelopes (`credentials: None`) use the gateway's default
//! identity. Values are encoded with either `serde_json` or `bincode`; see
//! [`crate::codec`].
use std::fmt::{Debug, Formatter};

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::observations::{
    RetrieveObservations2DCommand, RetrieveObservations2DResponse, StoreObservations2DCommand,
    StoreObservations2DResponse,
};

/// Username and password presented to the gateway.
#[derive(Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    /// Account secret. Never printed by `Debug`.
    pub password: String,
}

impl Credentials {
    /// Creates a new credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Operation requested from the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub enum Request {
    /// Liveness probe echoing `message`.
    TestLink {
        /// Free text echoed in the diagnostic.
        message: String,
    },
    /// Read a 2-D observation set.
    Retrieve(RetrieveObservations2DCommand),
    /// Write a 2-D observation set.
    Store(StoreObservations2DCommand),
}

impl Request {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::TestLink { .. } => "test_link",
            Request::Retrieve(_) => "retrieve_observations_2d",
            Request::Store(_) => "store_observations_2d",
        }
    }
}

/// Request plus the session it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct Envelope {
    /// `None` for the anonymous/default session.
    pub credentials: Option<Credentials>,
    /// Operation to perform.
    pub request: Request,
}

impl Envelope {
    /// Wrap `request` for the given session.
    pub fn new(credentials: Option<Credentials>, request: Request) -> Self {
        Envelope {
            credentials,
            request,
        }
    }
}

/// Gateway answer to an `Envelope`.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub enum Reply {
    /// Diagnostic text of a liveness probe.
    LinkTest {
        /// Contains `failed` when the session is not valid.
        message: String,
    },
    /// Outcome of a retrieval.
    Retrieved(RetrieveObservations2DResponse),
    /// Outcome of a store.
    Stored(StoreObservations2DResponse),
    /// The request could not be processed at all.
    Rejected {
        /// Human-readable cause.
        reason: String,
    },
}
