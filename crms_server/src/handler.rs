//! Turns decoded envelopes into replies.
//!
//! The dispatcher authenticates every envelope against the fixture book, then
//! answers from canned data. Service-level failures (denied access, unknown
//! subjects, rejected cells) are encoded in the reply; only a poisoned ledger
//! lock surfaces as an error.
use std::sync::{Arc, Mutex};

use chrono::Utc;
use crms_common::layout::Axis;
use crms_common::{
    CellError, Credentials, Envelope, Reply, Request, Result, RetrieveObservations2DCommand,
    RetrieveObservations2DResponse, RetrieveResponseStatus, StoreObservations2DCommand,
    StoreObservations2DResponse,
};
use log::{debug, info, warn};

use crate::model::fixture::FixtureBook;
use crate::model::ledger::{StoreLedger, StoredBatch};

/// Shared request handler used by every connection thread.
#[derive(Clone)]
pub struct Dispatcher {
    book: Arc<FixtureBook>,
    ledger: Arc<Mutex<StoreLedger>>,
}

impl Dispatcher {
    /// Create a dispatcher over a fixture book and a ledger.
    pub fn new(book: Arc<FixtureBook>, ledger: Arc<Mutex<StoreLedger>>) -> Self {
        Self { book, ledger }
    }

    /// Ledger of accepted store commands.
    pub fn ledger(&self) -> Arc<Mutex<StoreLedger>> {
        Arc::clone(&self.ledger)
    }

    /// Answer one envelope.
    pub fn handle(&self, envelope: Envelope) -> Result<Reply> {
        let credentials = envelope.credentials.as_ref();
        debug!(
            "Handling {} for {}",
            envelope.request.kind(),
            credentials.map(|c| c.username.as_str()).unwrap_or("<anonymous>")
        );

        match envelope.request {
            Request::TestLink { message } => Ok(self.test_link(credentials, &message)),
            Request::Retrieve(command) => Ok(self.retrieve(credentials, &command)),
            Request::Store(command) => self.store(credentials, command),
        }
    }

    fn test_link(&self, credentials: Option<&Credentials>, message: &str) -> Reply {
        debug!("Link test message: {:?}", message);
        // Only the authorization outcome may put "failed" into the diagnostic.
        let message = match self.book.authorize(credentials) {
            Ok(_) => format!("Link test succeeded ({} byte message)", message.len()),
            Err(reason) => {
                warn!("Link test denied: {}", reason);
                format!("Link test failed: {}", reason)
            }
        };
        Reply::LinkTest { message }
    }

    fn retrieve(
        &self,
        credentials: Option<&Credentials>,
        command: &RetrieveObservations2DCommand,
    ) -> Reply {
        if let Err(reason) = self.book.authorize(credentials) {
            return Reply::Retrieved(RetrieveObservations2DResponse::with_status(
                RetrieveResponseStatus::AccessDenied,
                reason,
            ));
        }

        if let Err(e) = command.validate() {
            return Reply::Retrieved(RetrieveObservations2DResponse::with_status(
                RetrieveResponseStatus::SystemError,
                e.to_string(),
            ));
        }

        if let Some(unknown) = command
            .subjects
            .iter()
            .find(|s| !self.book.is_known_subject(s))
        {
            info!("Retrieval for unknown subject {}", unknown);
            return Reply::Retrieved(RetrieveObservations2DResponse::with_status(
                RetrieveResponseStatus::SystemError,
                format!("unknown subject '{}'", unknown),
            ));
        }

        match self.book.find_retrieval(command) {
            Some(values) => {
                Reply::Retrieved(RetrieveObservations2DResponse::available(values.clone()))
            }
            None => Reply::Retrieved(RetrieveObservations2DResponse::with_status(
                RetrieveResponseStatus::NotAvailable,
                "no observations held for this query",
            )),
        }
    }

    fn store(
        &self,
        credentials: Option<&Credentials>,
        command: StoreObservations2DCommand,
    ) -> Result<Reply> {
        let cell_total = u32::try_from(command.values.cell_count()).unwrap_or(u32::MAX);

        let username = match self.book.authorize(credentials) {
            Ok(username) => username,
            Err(reason) => {
                return Ok(Reply::Stored(StoreObservations2DResponse::failed(
                    cell_total, reason,
                )));
            }
        };

        if let Err(e) = command.validate() {
            return Ok(Reply::Stored(StoreObservations2DResponse::failed(
                cell_total,
                e.to_string(),
            )));
        }

        let (errors, cells_written) = check_cells(&self.book, &command);
        let response = StoreObservations2DResponse::from_cell_errors(errors);
        info!(
            "Store of {} cells for {:?}: {} written, {} rejected",
            cell_total, command.subjects, cells_written, response.errors_total
        );

        if cells_written > 0 {
            let mut ledger = self.ledger.lock()?;
            ledger.record(StoredBatch {
                received_at: Utc::now(),
                username,
                command,
                cells_written,
            });
        }
        Ok(Reply::Stored(response))
    }
}

/// Per-cell acceptance checks of a validated store command.
///
/// A cell is rejected when one of its subjects is unknown or when its
/// non-empty value is not a finite number. Empty cells are skipped.
fn check_cells(book: &FixtureBook, command: &StoreObservations2DCommand) -> (Vec<CellError>, usize) {
    let axes = command.axes();
    let (row_axes, column_axes) = command.layout.oriented_axes(command.transpose_view);
    let mut errors = Vec::new();
    let mut written = 0;

    for (row, cells) in command.values.iter_rows().enumerate() {
        for (column, value) in cells.iter().enumerate() {
            let cell_subject = axes
                .entry_at(row_axes, row, Axis::Subject)
                .or_else(|| axes.entry_at(column_axes, column, Axis::Subject));
            let unknown = match cell_subject {
                Some(subject) => (!book.is_known_subject(subject)).then_some(subject),
                None => command
                    .subjects
                    .iter()
                    .map(String::as_str)
                    .find(|s| !book.is_known_subject(s)),
            };

            let reason = if let Some(subject) = unknown {
                Some(format!("unknown subject '{}'", subject))
            } else if value.trim().is_empty() {
                continue;
            } else if !is_numeric(value) {
                Some(format!("value '{}' is not numeric", value))
            } else {
                None
            };

            match reason {
                Some(reason) => errors.push(CellError {
                    row: row as u32,
                    column: column as u32,
                    reason,
                }),
                None => written += 1,
            }
        }
    }
    (errors, written)
}

fn is_numeric(value: &str) -> bool {
    value
        .trim()
        .parse::<f64>()
        .map(f64::is_finite)
        .unwrap_or(false)
}
