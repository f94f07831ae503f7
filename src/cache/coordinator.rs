//! Cache refresh coordinator
//!
//! One run moves through
//!
//! ```text
//! START → FETCHING → COMPARING → UNCHANGED  → DONE
//!                              ↘ PUBLISHING → DONE
//! (any failure)                             → FAILED
//! ```
//!
//! Publishing writes the snapshot first and the pointer second, so the
//! pointer only ever names a snapshot that exists. Runs are assumed not to
//! overlap; the caller is responsible for serializing them.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use super::snapshot::{SnapshotAddress, SnapshotStore};
use crate::catalog::DatasetSource;
use crate::error::{DataIntegrityWarning, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Start,
    Fetching,
    Comparing,
    Unchanged,
    Publishing,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Start => "START",
            RunState::Fetching => "FETCHING",
            RunState::Comparing => "COMPARING",
            RunState::Unchanged => "UNCHANGED",
            RunState::Publishing => "PUBLISHING",
            RunState::Done => "DONE",
            RunState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Cached snapshot already matches; nothing written
    Unchanged { snapshot: SnapshotAddress },
    /// New snapshot written and pointer moved to it
    Published {
        snapshot: SnapshotAddress,
        previous: Option<SnapshotAddress>,
    },
}

impl RunOutcome {
    pub fn snapshot(&self) -> &SnapshotAddress {
        match self {
            RunOutcome::Unchanged { snapshot } | RunOutcome::Published { snapshot, .. } => snapshot,
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, RunOutcome::Published { .. })
    }
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// States visited, in order, ending with `Done`
    pub states: Vec<RunState>,
    pub outcome: RunOutcome,
    pub plant_count: usize,
    pub pages: usize,
    /// SHA-256 of the serialized dataset, hex encoded
    pub content_sha256: String,
    pub warnings: Vec<DataIntegrityWarning>,
}

struct StateTrace {
    states: Vec<RunState>,
}

impl StateTrace {
    fn new() -> Self {
        Self {
            states: vec![RunState::Start],
        }
    }

    fn current(&self) -> RunState {
        self.states.last().copied().unwrap_or(RunState::Start)
    }

    fn enter(&mut self, next: RunState) {
        debug!(from = %self.current(), to = %next, "State transition");
        self.states.push(next);
    }
}

pub struct CacheRefreshCoordinator {
    source: Arc<dyn DatasetSource>,
    snapshots: SnapshotStore,
}

impl CacheRefreshCoordinator {
    pub fn new(source: Arc<dyn DatasetSource>, snapshots: SnapshotStore) -> Self {
        Self { source, snapshots }
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Run once, naming any new snapshot after the current time
    pub async fn run(&self) -> Result<RunReport> {
        self.run_at(Utc::now()).await
    }

    /// Run once with an explicit start timestamp
    pub async fn run_at(&self, started_at: DateTime<Utc>) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("refresh", %run_id);

        async move {
            info!(%started_at, "Cache refresh starting");
            let mut trace = StateTrace::new();
            match self.execute(run_id, started_at, &mut trace).await {
                Ok(report) => Ok(report),
                Err(e) => {
                    let failed_in = trace.current();
                    trace.enter(RunState::Failed);
                    error!(state = %failed_in, error = %e, "Cache refresh failed");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        run_id: Uuid,
        started_at: DateTime<Utc>,
        trace: &mut StateTrace,
    ) -> Result<RunReport> {
        trace.enter(RunState::Fetching);
        let assembled = self.source.assemble().await?;
        let fresh = assembled.dataset.to_bytes()?;
        let content_sha256 = hex::encode(Sha256::digest(&fresh));
        info!(
            bytes = fresh.len(),
            sha256 = %content_sha256,
            "Dataset serialized"
        );

        trace.enter(RunState::Comparing);
        let current = self.snapshots.load_current().await?;

        let previous = match current {
            None => {
                info!("No cached snapshot");
                None
            }
            Some(current) => {
                if matches_snapshot(&fresh, &current.bytes)? {
                    trace.enter(RunState::Unchanged);
                    info!(snapshot = %current.address.path, "Cached snapshot is up to date");
                    trace.enter(RunState::Done);
                    return Ok(RunReport {
                        run_id,
                        started_at,
                        states: trace.states.clone(),
                        outcome: RunOutcome::Unchanged {
                            snapshot: current.address,
                        },
                        plant_count: assembled.dataset.plants.len(),
                        pages: assembled.pages,
                        content_sha256,
                        warnings: assembled.warnings,
                    });
                }
                info!(snapshot = %current.address.path, "Cached snapshot is stale");
                Some(current.address)
            }
        };

        trace.enter(RunState::Publishing);
        let snapshot = self.snapshots.write_snapshot(started_at, fresh).await?;
        info!(snapshot = %snapshot.path, "Snapshot written");
        self.snapshots.write_pointer(&snapshot).await?;
        info!(url = %snapshot.url, "Pointer updated");
        trace.enter(RunState::Done);

        Ok(RunReport {
            run_id,
            started_at,
            states: trace.states.clone(),
            outcome: RunOutcome::Published { snapshot, previous },
            plant_count: assembled.dataset.plants.len(),
            pages: assembled.pages,
            content_sha256,
            warnings: assembled.warnings,
        })
    }
}

/// Compare fresh bytes with the stored snapshot as JSON values.
///
/// Formatting and key order are ignored; any key present on only one side is
/// a difference. A stored snapshot that does not parse as JSON never matches.
fn matches_snapshot(fresh: &[u8], stored: &[u8]) -> Result<bool> {
    let fresh: Value = serde_json::from_slice(fresh)?;
    match serde_json::from_slice::<Value>(stored) {
        Ok(stored) => Ok(stored == fresh),
        Err(e) => {
            warn!(error = %e, "Cached snapshot is not valid JSON");
            Ok(false)
        }
    }
}
