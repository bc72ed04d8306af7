//! Bulk status aggregation
//!
//! Polls a list of units strictly sequentially through the shared bus,
//! cross-checks the vent number derived from each unit's register
//! addresses, and publishes the completed snapshot to the result store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{Result, VentsrvError};
use crate::status::{StatusReader, UnitStatus};
use crate::store::ResultStore;

/// Register block stride between consecutive vents in the address map
const VENT_BLOCK_STRIDE: i32 = 156;
/// Base address of the first vent's temperature register
const TEMP_BASE_ADDRESS: i32 = 1;
/// Base address of the first vent's speed register
const SPEED_BASE_ADDRESS: i32 = 36;

/// Addressing for polling one unit within a bulk run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VentQuery {
    pub slave_id: u8,
    pub on_address: u16,
    pub temp_address: u16,
    pub speed_address: u16,
}

/// Status fields of one polled unit, or an error marker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VentReading {
    Status(UnitStatus),
    Failed {
        #[serde(rename = "Status")]
        status: String,
        message: String,
    },
}

impl VentReading {
    fn failed(message: impl Into<String>) -> Self {
        VentReading::Failed {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

/// One unit's entry in a bulk snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VentResult {
    pub slave_id: u8,
    #[serde(flatten)]
    pub reading: VentReading,
    /// Logical vent index, present only when both address-derived
    /// formulas agree
    pub vent_number: Option<u16>,
}

/// Result of one completed bulk status run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkSnapshot {
    pub results: Vec<VentResult>,
    pub captured_at: DateTime<Utc>,
}

/// Derive the vent number from the temperature and speed register
/// addresses. The two address spaces are laid out in blocks of 156
/// registers per vent; both derivations must agree or the reading cannot
/// be attributed to a vent.
pub fn derive_vent_number(temp_address: u16, speed_address: u16) -> Option<u16> {
    let from_temp = (i32::from(temp_address) - TEMP_BASE_ADDRESS).div_euclid(VENT_BLOCK_STRIDE) + 1;
    let from_speed =
        (i32::from(speed_address) - SPEED_BASE_ADDRESS).div_euclid(VENT_BLOCK_STRIDE) + 1;

    if from_temp == from_speed {
        Some(from_temp as u16)
    } else {
        None
    }
}

/// Polls units sequentially and produces bulk snapshots
pub struct BulkStatusAggregator {
    reader: StatusReader,
    store: Arc<ResultStore>,
    pacing: Duration,
}

impl BulkStatusAggregator {
    pub fn new(reader: StatusReader, store: Arc<ResultStore>, pacing: Duration) -> Self {
        Self {
            reader,
            store,
            pacing,
        }
    }

    /// Run one bulk poll: strictly sequential, paced between queries, one
    /// failing query never aborts the rest. The completed snapshot
    /// replaces the previous one in the result store.
    pub async fn run(&self, queries: &[VentQuery]) -> BulkSnapshot {
        let mut results = Vec::with_capacity(queries.len());

        for query in queries {
            let result = match self
                .reader
                .read(
                    query.slave_id,
                    query.on_address,
                    query.temp_address,
                    query.speed_address,
                )
                .await
            {
                Ok(status) => {
                    let vent_number =
                        derive_vent_number(query.temp_address, query.speed_address);
                    if vent_number.is_none() {
                        warn!(
                            "Vent number mismatch for slave {}: temp address {} and speed address {} disagree",
                            query.slave_id, query.temp_address, query.speed_address
                        );
                    }
                    VentResult {
                        slave_id: query.slave_id,
                        reading: VentReading::Status(status),
                        vent_number,
                    }
                }
                Err(e) => {
                    warn!("Bulk status read for slave {} failed: {}", query.slave_id, e);
                    VentResult {
                        slave_id: query.slave_id,
                        reading: VentReading::failed(e.to_string()),
                        vent_number: None,
                    }
                }
            };
            results.push(result);

            // Pace the bus between units
            tokio::time::sleep(self.pacing).await;
        }

        let snapshot = BulkSnapshot {
            results,
            captured_at: Utc::now(),
        };
        self.store.put(snapshot.clone());
        snapshot
    }

    /// Move the aggregator onto its worker task. Runs submitted while one
    /// is in flight queue behind it; two runs never interleave on the bus.
    pub fn spawn(self) -> (AggregatorHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Vec<VentQuery>>(32);

        let handle = tokio::spawn(async move {
            while let Some(queries) = rx.recv().await {
                info!("Starting bulk status run over {} units", queries.len());
                let snapshot = self.run(&queries).await;
                info!(
                    "Bulk status run completed: {} results captured at {}",
                    snapshot.results.len(),
                    snapshot.captured_at
                );
            }
        });

        (AggregatorHandle { tx }, handle)
    }
}

/// Submission handle for the aggregator worker
#[derive(Clone)]
pub struct AggregatorHandle {
    tx: mpsc::Sender<Vec<VentQuery>>,
}

impl AggregatorHandle {
    /// Enqueue a bulk status run; returns as soon as the run is queued
    pub async fn submit(&self, queries: Vec<VentQuery>) -> Result<()> {
        self.tx
            .send(queries)
            .await
            .map_err(|e| VentsrvError::QueueError(format!("Status worker unavailable: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vent_number_first_block() {
        assert_eq!(derive_vent_number(1, 36), Some(1));
    }

    #[test]
    fn test_vent_number_second_block() {
        assert_eq!(derive_vent_number(157, 192), Some(2));
    }

    #[test]
    fn test_vent_number_mismatch() {
        assert_eq!(derive_vent_number(1, 192), None);
    }

    #[test]
    fn test_vent_number_mid_block() {
        // Any address inside a block maps to that block's vent
        assert_eq!(derive_vent_number(100, 100), Some(1));
        assert_eq!(derive_vent_number(313, 348), Some(3));
    }
}
