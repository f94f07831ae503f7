//! wucols-export
//!
//! Aggregates the WUCOLS plant catalog from its JSON:API backend into a single
//! denormalized dataset, and publishes it as an immutable snapshot whenever
//! it differs from the cached one.
//!
//! - [`jsonapi`]: pagination and strict decode of the remote collection
//! - [`catalog`]: relationship resolution, normalization, dataset assembly
//! - [`cache`]: object stores, snapshots, the pointer and the refresh run

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod jsonapi;

pub use cache::{CacheRefreshCoordinator, RunOutcome, RunReport, SnapshotStore};
pub use catalog::{Dataset, DatasetAssembler, DatasetSource};
pub use config::ExportConfig;
pub use error::{DataIntegrityWarning, ExportError, Result};
