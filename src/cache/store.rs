//! Object store abstraction for the snapshot cache
//!
//! The contract mirrors blob storage semantics:
//! - single-object puts are atomic; a reader never sees a partial object
//! - a put may carry a create-only precondition
//! - every object has a public address derived from the store's base URL

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// Precondition for a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePrecondition {
    /// Write only if the object does not exist yet
    DoesNotExist,
    /// Write unconditionally
    #[default]
    None,
}

/// Result of a conditional write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteResult {
    Success,
    PreconditionFailed,
}

/// HTTP headers a blob is served with, plus the write precondition
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PutOptions {
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub precondition: WritePrecondition,
}

impl PutOptions {
    pub fn json(file_name: &str) -> Self {
        Self {
            content_type: Some("application/json".to_string()),
            content_disposition: Some(format!("filename={}", file_name)),
            ..Self::default()
        }
    }

    pub fn cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = Some(value.into());
        self
    }

    pub fn create_only(mut self) -> Self {
        self.precondition = WritePrecondition::DoesNotExist;
        self
    }
}

/// Metadata about a stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub path: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read an object; `None` if it does not exist
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Write an object atomically.
    ///
    /// A failed precondition is a normal result, not an error.
    async fn put(&self, path: &str, data: Vec<u8>, options: PutOptions) -> Result<WriteResult>;

    /// Objects whose path starts with `prefix`, in no particular order
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>>;

    /// Public URL prefix of the store, without trailing slash
    fn base_url(&self) -> &str;

    /// Public address of an object
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url().trim_end_matches('/'), path)
    }

    /// Object path for an address produced by [`ObjectStore::url`]
    fn path_for_url(&self, url: &str) -> Option<String> {
        let base = self.base_url().trim_end_matches('/');
        url.strip_prefix(base)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|path| !path.is_empty())
            .map(str::to_string)
    }
}
