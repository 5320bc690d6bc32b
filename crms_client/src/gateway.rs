//! Gateway client: session handling and the four gateway operations.
//!
//! Failures of the external system are reported through response fields,
//! never as `Err`: a liveness probe that cannot reach the gateway returns a
//! message containing `failed`, a retrieval that cannot be answered returns
//! `SystemError`, a store that cannot be delivered counts every cell as an
//! error. `Err` is reserved for commands that fail local validation.
use crms_common::{
    Credentials, Envelope, Reply, Request, Result, RetrieveObservations2DCommand,
    RetrieveObservations2DResponse, RetrieveResponseStatus, StoreObservations2DCommand,
    StoreObservations2DResponse,
};
use log::{error, info, warn};

use crate::config::ClientConfig;
use crate::sender::{TcpTransport, Transport};

/// Identity attached to every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    /// The gateway's default identity.
    #[default]
    Anonymous,
    /// Credentials set through [`Gateway::login`].
    Credentialed(Credentials),
}

impl Session {
    /// Credentials to present, if any.
    pub fn credentials(&self) -> Option<&Credentials> {
        match self {
            Session::Anonymous => None,
            Session::Credentialed(credentials) => Some(credentials),
        }
    }

    /// Account name, if any.
    pub fn username(&self) -> Option<&str> {
        self.credentials().map(|c| c.username.as_str())
    }
}

/// Client for the observation gateway.
///
/// One request is in flight at a time; every call blocks until the gateway
/// answers or the transport gives up.
pub struct Gateway<T: Transport = TcpTransport> {
    transport: T,
    session: Session,
}

impl Gateway<TcpTransport> {
    /// Client for the gateway described by `config`. Connects on first use.
    pub fn connect(config: ClientConfig) -> Self {
        Self::with_transport(TcpTransport::new(config))
    }
}

impl<T: Transport> Gateway<T> {
    /// Client over an arbitrary transport, starting with an anonymous session.
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            session: Session::Anonymous,
        }
    }

    /// Use these credentials for all later calls.
    ///
    /// Nothing is checked here; invalid credentials only show up in later
    /// responses, e.g. as `failed` in [`Gateway::test_link`].
    pub fn login(&mut self, username: impl Into<String>, password: impl Into<String>) {
        let credentials = Credentials::new(username, password);
        info!("Session credentials set for {}", credentials.username);
        self.session = Session::Credentialed(credentials);
    }

    /// Return to the anonymous session.
    pub fn logout(&mut self) {
        self.session = Session::Anonymous;
    }

    /// Current session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Close the connection; the next call reconnects.
    pub fn disconnect(&mut self) {
        self.transport.close();
    }

    /// Liveness probe. The diagnostic contains `failed` when the session is not valid
    /// or the gateway cannot be reached.
    pub fn test_link(&mut self, message: &str) -> String {
        let request = Request::TestLink {
            message: message.to_string(),
        };
        match self.send(request) {
            Ok(Reply::LinkTest { message }) => message,
            Ok(Reply::Rejected { reason }) => format!("Link test failed: {}", reason),
            Ok(other) => format!("Link test failed: unexpected reply {}", reply_kind(&other)),
            Err(e) => format!("Link test failed: {}", e),
        }
    }

    /// Submit a read query.
    ///
    /// Returns `Err` only when `command` fails local validation.
    pub fn retrieve_observations_2d(
        &mut self,
        command: &RetrieveObservations2DCommand,
    ) -> Result<RetrieveObservations2DResponse> {
        command.validate()?;

        let response = match self.send(Request::Retrieve(command.clone())) {
            Ok(Reply::Retrieved(response)) => response,
            Ok(Reply::Rejected { reason }) => RetrieveObservations2DResponse::with_status(
                RetrieveResponseStatus::SystemError,
                format!("request rejected: {}", reason),
            ),
            Ok(other) => RetrieveObservations2DResponse::with_status(
                RetrieveResponseStatus::SystemError,
                format!("unexpected reply {}", reply_kind(&other)),
            ),
            Err(e) => RetrieveObservations2DResponse::with_status(
                RetrieveResponseStatus::SystemError,
                e.to_string(),
            ),
        };

        if response.is_available() && !response.matches_axes(command) {
            warn!(
                "Retrieved grid headers do not match the requested axes (layout {}, transpose {})",
                command.layout, command.transpose_view
            );
        }
        Ok(response)
    }

    /// Submit a write.
    ///
    /// Returns `Err` only when `command` fails local validation.
    pub fn store_observations_2d(
        &mut self,
        command: &StoreObservations2DCommand,
    ) -> Result<StoreObservations2DResponse> {
        command.validate()?;
        let cell_total = u32::try_from(command.values.cell_count()).unwrap_or(u32::MAX);

        let response = match self.send(Request::Store(command.clone())) {
            Ok(Reply::Stored(response)) => response,
            Ok(Reply::Rejected { reason }) => StoreObservations2DResponse::failed(
                cell_total,
                format!("request rejected: {}", reason),
            ),
            Ok(other) => StoreObservations2DResponse::failed(
                cell_total,
                format!("unexpected reply {}", reply_kind(&other)),
            ),
            Err(e) => StoreObservations2DResponse::failed(cell_total, e.to_string()),
        };
        Ok(response)
    }

    fn send(&mut self, request: Request) -> Result<Reply> {
        let kind = request.kind();
        info!(
            "Sending {} as {}",
            kind,
            self.session.username().unwrap_or("<anonymous>")
        );
        let envelope = Envelope::new(self.session.credentials().cloned(), request);
        self.transport.round_trip(&envelope).inspect_err(|e| {
            error!("{} failed: {}", kind, e);
        })
    }
}

fn reply_kind(reply: &Reply) -> &'static str {
    match reply {
        Reply::LinkTest { .. } => "link_test",
        Reply::Retrieved(_) => "retrieved",
        Reply::Stored(_) => "stored",
        Reply::Rejected { .. } => "rejected",
    }
}
