//! In-memory result storage
//!
//! `ResultStore` keeps the single most recent bulk status snapshot;
//! `CommandLog` keeps per-run command outcomes so batch results are
//! queryable instead of silently dropped.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregator::BulkSnapshot;
use crate::command::CommandOutcome;

/// Single-slot store for the latest bulk status snapshot
///
/// `put` swaps in a fresh immutable snapshot; `get` clones the Arc, so a
/// reader can never observe a partially written snapshot.
#[derive(Default)]
pub struct ResultStore {
    slot: RwLock<Option<Arc<BulkSnapshot>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the retained snapshot
    pub fn put(&self, snapshot: BulkSnapshot) {
        *self.slot.write() = Some(Arc::new(snapshot));
    }

    /// Latest snapshot, if any run has completed
    pub fn get(&self) -> Option<Arc<BulkSnapshot>> {
        self.slot.read().clone()
    }
}

/// State of one submitted command batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRun {
    pub run_id: Uuid,
    pub total: usize,
    pub finished: bool,
    pub outcomes: Vec<CommandOutcome>,
    pub submitted_at: DateTime<Utc>,
}

/// Run-id keyed log of command batch outcomes
#[derive(Default)]
pub struct CommandLog {
    runs: RwLock<HashMap<Uuid, BatchRun>>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly accepted batch
    pub fn create(&self, run_id: Uuid, total: usize) {
        self.runs.write().insert(
            run_id,
            BatchRun {
                run_id,
                total,
                finished: false,
                outcomes: Vec::with_capacity(total),
                submitted_at: Utc::now(),
            },
        );
    }

    /// Record one executed command's outcome
    pub fn append(&self, run_id: Uuid, outcome: CommandOutcome) {
        if let Some(run) = self.runs.write().get_mut(&run_id) {
            run.outcomes.push(outcome);
        }
    }

    /// Mark a batch as fully processed
    pub fn finish(&self, run_id: Uuid) {
        if let Some(run) = self.runs.write().get_mut(&run_id) {
            run.finished = true;
        }
    }

    /// Snapshot of one run's state
    pub fn get(&self, run_id: Uuid) -> Option<BatchRun> {
        self.runs.read().get(&run_id).cloned()
    }
}
