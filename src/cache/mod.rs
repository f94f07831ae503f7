//! Snapshot cache
//!
//! Immutable timestamp-named snapshots plus one pointer object, on top of a
//! small object-store abstraction with filesystem and in-memory backends.

pub mod coordinator;
pub mod fs;
pub mod memory;
pub mod snapshot;
pub mod store;

pub use coordinator::{CacheRefreshCoordinator, RunOutcome, RunReport, RunState};
pub use fs::FsStore;
pub use memory::MemoryStore;
pub use snapshot::{CacheStatus, Pointer, SnapshotAddress, SnapshotStore};
pub use store::{ObjectMeta, ObjectStore, PutOptions, WritePrecondition, WriteResult};
