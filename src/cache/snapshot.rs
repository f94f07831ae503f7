//! Snapshots and the pointer
//!
//! Object layout:
//!
//! ```text
//! data/<dataset>.<ISO-8601 timestamp>.json   immutable snapshot, cached forever
//! meta/<dataset>.json                        { "cachedBlobUrl": <snapshot URL> }, no-store
//! ```
//!
//! Snapshot names sort in time order because the timestamp has a fixed width.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::store::{ObjectMeta, ObjectStore, PutOptions, WriteResult};
use crate::error::{ExportError, Result};

const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

/// The mutable record naming the authoritative snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pointer {
    #[serde(rename = "cachedBlobUrl")]
    pub cached_blob_url: String,
}

/// Where a snapshot lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotAddress {
    pub path: String,
    pub url: String,
}

/// The snapshot the pointer currently names, with its raw bytes
#[derive(Debug, Clone)]
pub struct CurrentSnapshot {
    pub address: SnapshotAddress,
    pub bytes: Vec<u8>,
}

/// What is in the cache right now
#[derive(Debug, Clone)]
pub struct CacheStatus {
    pub pointer: Option<Pointer>,
    /// Snapshot the pointer resolves to, if it exists in the store
    pub current: Option<SnapshotAddress>,
    /// All snapshots, oldest first
    pub snapshots: Vec<ObjectMeta>,
    /// Snapshots newer than the current one; left behind when publishing
    /// stopped between the snapshot write and the pointer write
    pub orphans: Vec<ObjectMeta>,
}

#[derive(Clone)]
pub struct SnapshotStore {
    store: Arc<dyn ObjectStore>,
    dataset_name: String,
}

impl SnapshotStore {
    pub fn new(store: Arc<dyn ObjectStore>, dataset_name: impl Into<String>) -> Self {
        Self {
            store,
            dataset_name: dataset_name.into(),
        }
    }

    pub fn pointer_path(&self) -> String {
        format!("meta/{}.json", self.dataset_name)
    }

    fn snapshot_prefix(&self) -> String {
        format!("data/{}.", self.dataset_name)
    }

    pub fn snapshot_path(&self, timestamp: DateTime<Utc>) -> String {
        format!(
            "{}{}.json",
            self.snapshot_prefix(),
            timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }

    fn address(&self, path: String) -> SnapshotAddress {
        SnapshotAddress {
            url: self.store.url(&path),
            path,
        }
    }

    /// Read the pointer. A missing or unreadable pointer is `None`.
    pub async fn read_pointer(&self) -> Result<Option<Pointer>> {
        let path = self.pointer_path();
        let Some(bytes) = self.store.get(&path).await? else {
            debug!(path = %path, "No pointer");
            return Ok(None);
        };
        match serde_json::from_slice::<Pointer>(&bytes) {
            Ok(pointer) => Ok(Some(pointer)),
            Err(e) => {
                warn!(path = %path, error = %e, "Pointer is unreadable, treating cache as empty");
                Ok(None)
            }
        }
    }

    /// Resolve a pointer to an address inside this store
    pub fn resolve(&self, pointer: &Pointer) -> Option<SnapshotAddress> {
        let path = self.store.path_for_url(&pointer.cached_blob_url)?;
        Some(self.address(path))
    }

    /// Load the snapshot the pointer names, if both exist
    pub async fn load_current(&self) -> Result<Option<CurrentSnapshot>> {
        let Some(pointer) = self.read_pointer().await? else {
            return Ok(None);
        };
        let Some(address) = self.resolve(&pointer) else {
            warn!(
                url = %pointer.cached_blob_url,
                "Pointer names an address outside the store"
            );
            return Ok(None);
        };
        match self.store.get(&address.path).await? {
            Some(bytes) => Ok(Some(CurrentSnapshot { address, bytes })),
            None => {
                warn!(path = %address.path, "Pointer names a missing snapshot");
                Ok(None)
            }
        }
    }

    /// Write a new immutable snapshot named after `timestamp`.
    ///
    /// # Errors
    /// [`ExportError::SnapshotExists`] if the name is already taken.
    pub async fn write_snapshot(
        &self,
        timestamp: DateTime<Utc>,
        bytes: Vec<u8>,
    ) -> Result<SnapshotAddress> {
        let path = self.snapshot_path(timestamp);
        let file_name = path.rsplit('/').next().unwrap_or(&path).to_string();
        let options = PutOptions::json(&file_name)
            .cache_control(format!("max-age={}", SECONDS_PER_YEAR))
            .create_only();

        match self.store.put(&path, bytes, options).await? {
            WriteResult::Success => Ok(self.address(path)),
            WriteResult::PreconditionFailed => Err(ExportError::SnapshotExists(path)),
        }
    }

    /// Repoint the pointer at `address`
    pub async fn write_pointer(&self, address: &SnapshotAddress) -> Result<()> {
        let pointer = Pointer {
            cached_blob_url: address.url.clone(),
        };
        let body = serde_json::to_vec(&pointer)?;
        let options = PutOptions::json(&format!("{}-data.json", self.dataset_name))
            .cache_control("no-store");
        self.store.put(&self.pointer_path(), body, options).await?;
        Ok(())
    }

    /// All snapshots of this dataset, oldest first
    pub async fn list_snapshots(&self) -> Result<Vec<ObjectMeta>> {
        let prefix = self.snapshot_prefix();
        let mut snapshots: Vec<ObjectMeta> = self
            .store
            .list(&prefix)
            .await?
            .into_iter()
            .filter(|o| is_snapshot_name(&o.path, &prefix))
            .collect();
        snapshots.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(snapshots)
    }

    pub async fn status(&self) -> Result<CacheStatus> {
        let pointer = self.read_pointer().await?;
        let snapshots = self.list_snapshots().await?;

        let current = pointer
            .as_ref()
            .and_then(|p| self.resolve(p))
            .filter(|a| snapshots.iter().any(|s| s.path == a.path));

        let orphans = match &current {
            Some(current) => snapshots
                .iter()
                .filter(|s| s.path > current.path)
                .cloned()
                .collect(),
            None => snapshots.clone(),
        };

        Ok(CacheStatus {
            pointer,
            current,
            snapshots,
            orphans,
        })
    }
}

/// `<prefix><RFC 3339 timestamp>.json`; rejects datasets whose name merely
/// starts with ours, such as `wucols.staging`
fn is_snapshot_name(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(".json"))
        .is_some_and(|stamp| DateTime::parse_from_rfc3339(stamp).is_ok())
}
