//! Bulk command processing
//!
//! Accepted batches execute on a single background worker, strictly in
//! submission order, decoupled from the HTTP request that queued them.
//! Outcomes are retained in the command log under the batch's run id so a
//! client can poll for completion.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::command::{Command, CommandDispatcher};
use crate::error::{Result, VentsrvError};
use crate::store::CommandLog;

/// Immediate acknowledgement of an accepted batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAccepted {
    pub run_id: Uuid,
    pub accepted: usize,
}

struct CommandBatch {
    run_id: Uuid,
    commands: Vec<Command>,
}

/// Executes command batches on a background worker
#[derive(Clone)]
pub struct BulkCommandProcessor {
    tx: mpsc::Sender<CommandBatch>,
    log: Arc<CommandLog>,
}

impl BulkCommandProcessor {
    /// Start the worker task and return the submission handle
    pub fn spawn(
        dispatcher: CommandDispatcher,
        log: Arc<CommandLog>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<CommandBatch>(32);

        let worker_log = Arc::clone(&log);
        let handle = tokio::spawn(async move {
            while let Some(batch) = rx.recv().await {
                info!(
                    "Executing command batch {} ({} commands)",
                    batch.run_id,
                    batch.commands.len()
                );

                let mut failed = 0;
                for command in &batch.commands {
                    let outcome = dispatcher.execute(command).await;
                    if !outcome.succeeded {
                        failed += 1;
                        warn!("Batch {} command failed: {}", batch.run_id, outcome.message);
                    }
                    worker_log.append(batch.run_id, outcome);
                }
                worker_log.finish(batch.run_id);

                info!(
                    "Command batch {} finished: {}/{} succeeded",
                    batch.run_id,
                    batch.commands.len() - failed,
                    batch.commands.len()
                );
            }
        });

        (Self { tx, log }, handle)
    }

    /// Accept a batch for background execution. Returns immediately with
    /// the run id used to poll the outcome log.
    pub async fn submit(&self, commands: Vec<Command>) -> Result<BatchAccepted> {
        let run_id = Uuid::new_v4();
        let accepted = commands.len();
        self.log.create(run_id, accepted);

        self.tx
            .send(CommandBatch { run_id, commands })
            .await
            .map_err(|e| VentsrvError::QueueError(format!("Command worker unavailable: {}", e)))?;

        Ok(BatchAccepted { run_id, accepted })
    }
}
