//! In-memory object store
//!
//! Thread-safe via `RwLock`. Keeps the put options of every object so tests
//! can check served headers, and can be told to fail writes under a prefix to
//! simulate a crash part-way through publishing.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::store::{ObjectMeta, ObjectStore, PutOptions, WritePrecondition, WriteResult};
use crate::error::{ExportError, Result};

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub options: PutOptions,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    base_url: String,
    objects: RwLock<HashMap<String, StoredObject>>,
    failing_prefixes: RwLock<Vec<String>>,
    puts: RwLock<Vec<String>>,
}

impl MemoryStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Fail every subsequent put whose path starts with `prefix`
    pub fn fail_puts_under(&self, prefix: impl Into<String>) {
        self.failing_prefixes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(prefix.into());
    }

    pub fn clear_failures(&self) {
        self.failing_prefixes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn object(&self, path: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .cloned()
    }

    /// Paths of successful puts, in order
    pub fn puts(&self) -> Vec<String> {
        self.puts.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.object(path).map(|o| o.data))
    }

    async fn put(&self, path: &str, data: Vec<u8>, options: PutOptions) -> Result<WriteResult> {
        let failing = self
            .failing_prefixes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()));
        if failing {
            return Err(ExportError::Storage(format!("injected write failure: {}", path)));
        }

        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        if options.precondition == WritePrecondition::DoesNotExist && objects.contains_key(path) {
            return Ok(WriteResult::PreconditionFailed);
        }
        objects.insert(
            path.to_string(),
            StoredObject {
                data,
                options,
                last_modified: Utc::now(),
            },
        );
        self.puts
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(path.to_string());
        Ok(WriteResult::Success)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        Ok(objects
            .iter()
            .filter(|(path, _)| path.starts_with(prefix))
            .map(|(path, o)| ObjectMeta {
                path: path.clone(),
                size: o.data.len() as u64,
                last_modified: Some(o.last_modified),
            })
            .collect())
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_only_put_does_not_overwrite() {
        let store = MemoryStore::new("mem://cache");
        let first = store
            .put("data/a.json", b"1".to_vec(), PutOptions::default().create_only())
            .await
            .unwrap();
        let second = store
            .put("data/a.json", b"2".to_vec(), PutOptions::default().create_only())
            .await
            .unwrap();
        assert_eq!(first, WriteResult::Success);
        assert_eq!(second, WriteResult::PreconditionFailed);
        assert_eq!(store.get("data/a.json").await.unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.puts(), vec!["data/a.json"]);
    }

    #[tokio::test]
    async fn injected_failure_leaves_store_untouched() {
        let store = MemoryStore::new("mem://cache");
        store.fail_puts_under("meta/");
        let err = store
            .put("meta/wucols.json", b"{}".to_vec(), PutOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Storage(_)));
        assert!(store.get("meta/wucols.json").await.unwrap().is_none());
        assert!(store.list("meta/").await.unwrap().is_empty());
    }
}
