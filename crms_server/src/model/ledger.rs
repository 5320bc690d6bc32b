//! In-memory record of accepted store commands.
//!
//! The fixture gateway does not persist or compute anything from stored
//! values; it keeps what it accepted so an operator (or a test) can inspect
//! the traffic afterwards. It exposes three core operations:
//!
//! - `StoreLedger::record(batch)`: append an accepted batch.
//! - `StoreLedger::batches()`: read-only view of everything recorded, oldest first.
//! - `StoreLedger::cells_written()`: total number of cells written across batches.
//!
//! Design notes:
//! - The ledger is not synchronized; the server shares it as `Arc<Mutex<StoreLedger>>`.
//! - Capacity is bounded; once full, the oldest batches are dropped first.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use crms_common::StoreObservations2DCommand;

/// Default number of batches kept before the oldest are dropped.
pub const DEFAULT_LEDGER_CAPACITY: usize = 1024;

/// One accepted store command.
#[derive(Debug, Clone)]
pub struct StoredBatch {
    /// When the gateway accepted the batch.
    pub received_at: DateTime<Utc>,
    /// Account that sent it; `None` for the anonymous session.
    pub username: Option<String>,
    /// The command as received.
    pub command: StoreObservations2DCommand,
    /// Non-empty cells that passed the acceptance checks.
    pub cells_written: usize,
}

/// Bounded, append-only list of accepted batches.
pub struct StoreLedger {
    batches: VecDeque<StoredBatch>,
    capacity: usize,
}

impl StoreLedger {
    /// Create a ledger holding at most `capacity` batches.
    pub fn new(capacity: usize) -> Self {
        Self {
            batches: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append a batch, evicting the oldest one when full.
    pub fn record(&mut self, batch: StoredBatch) {
        if self.batches.len() == self.capacity {
            self.batches.pop_front();
        }
        self.batches.push_back(batch);
    }

    /// Recorded batches, oldest first.
    pub fn batches(&self) -> impl Iterator<Item = &StoredBatch> {
        self.batches.iter()
    }

    /// Number of recorded batches.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// `true` when nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Total cells written across all recorded batches.
    pub fn cells_written(&self) -> usize {
        self.batches.iter().map(|b| b.cells_written).sum()
    }
}

impl Default for StoreLedger {
    fn default() -> Self {
        Self::new(DEFAULT_LEDGER_CAPACITY)
    }
}
