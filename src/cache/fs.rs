//! Filesystem object store
//!
//! Objects are files under a root directory. Each put writes a temp file in
//! the target directory, fsyncs it and renames it into place, so a reader
//! sees either the old object or the complete new one. Serving headers are
//! the job of whatever fronts the directory and are not persisted.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tracing::debug;

use super::store::{ObjectMeta, ObjectStore, PutOptions, WritePrecondition, WriteResult};
use crate::error::{ExportError, Result};

const TEMP_PREFIX: &str = ".tmp-";

#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    base_url: String,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let valid = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(ExportError::Storage(format!("invalid object path '{}'", path)));
        }
        Ok(self.root.join(relative))
    }
}

fn write_atomic(target: &Path, data: &[u8], precondition: WritePrecondition) -> Result<WriteResult> {
    let dir = target
        .parent()
        .ok_or_else(|| ExportError::Storage(format!("no parent for {}", target.display())))?;
    std::fs::create_dir_all(dir)?;

    if precondition == WritePrecondition::DoesNotExist && target.exists() {
        return Ok(WriteResult::PreconditionFailed);
    }

    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;

    match precondition {
        WritePrecondition::DoesNotExist => {
            if let Err(e) = tmp.persist_noclobber(target) {
                if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                    return Ok(WriteResult::PreconditionFailed);
                }
                return Err(e.error.into());
            }
        }
        WritePrecondition::None => {
            persist(tmp, target)?;
        }
    }

    // Make the rename itself durable.
    std::fs::File::open(dir)?.sync_all()?;
    Ok(WriteResult::Success)
}

fn persist(tmp: NamedTempFile, target: &Path) -> Result<()> {
    tmp.persist(target).map_err(|e| ExportError::Io(e.error))?;
    Ok(())
}

#[async_trait]
impl ObjectStore for FsStore {
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let file = self.resolve(path)?;
        match tokio::fs::read(&file).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, path: &str, data: Vec<u8>, options: PutOptions) -> Result<WriteResult> {
        let target = self.resolve(path)?;
        debug!(
            path,
            bytes = data.len(),
            cache_control = options.cache_control.as_deref().unwrap_or(""),
            "Writing object"
        );
        let precondition = options.precondition;
        tokio::task::spawn_blocking(move || write_atomic(&target, &data, precondition))
            .await
            .map_err(|e| ExportError::Storage(format!("write task failed: {}", e)))?
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let (dir, name_prefix) = match prefix.rsplit_once('/') {
            Some((dir, rest)) => (dir, rest),
            None => ("", prefix),
        };
        let dir_path = if dir.is_empty() {
            self.root.clone()
        } else {
            self.resolve(dir)?
        };

        let mut entries = match tokio::fs::read_dir(&dir_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut objects = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(TEMP_PREFIX) || !name.starts_with(name_prefix) {
                continue;
            }
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            objects.push(ObjectMeta {
                path: if dir.is_empty() {
                    name
                } else {
                    format!("{}/{}", dir, name)
                },
                size: meta.len(),
                last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
            });
        }
        Ok(objects)
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path(), "file://cache");

        store
            .put("data/wucols.a.json", b"one".to_vec(), PutOptions::default())
            .await
            .unwrap();
        store
            .put("data/other.json", b"two".to_vec(), PutOptions::default())
            .await
            .unwrap();

        assert_eq!(
            store.get("data/wucols.a.json").await.unwrap(),
            Some(b"one".to_vec())
        );
        assert_eq!(store.get("data/missing.json").await.unwrap(), None);

        let listed = store.list("data/wucols.").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].path, "data/wucols.a.json");
        assert_eq!(listed[0].size, 3);
        assert!(store.list("nothing/here").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_only_refuses_existing_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path(), "file://cache");
        let options = PutOptions::default().create_only();

        let first = store
            .put("data/x.json", b"1".to_vec(), options.clone())
            .await
            .unwrap();
        let second = store.put("data/x.json", b"2".to_vec(), options).await.unwrap();

        assert_eq!(first, WriteResult::Success);
        assert_eq!(second, WriteResult::PreconditionFailed);
        assert_eq!(store.get("data/x.json").await.unwrap(), Some(b"1".to_vec()));
    }

    #[tokio::test]
    async fn overwrite_replaces_whole_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path(), "file://cache");
        store
            .put("meta/p.json", b"old pointer".to_vec(), PutOptions::default())
            .await
            .unwrap();
        store
            .put("meta/p.json", b"new".to_vec(), PutOptions::default())
            .await
            .unwrap();
        assert_eq!(store.get("meta/p.json").await.unwrap(), Some(b"new".to_vec()));
        // no temp files left behind
        assert_eq!(std::fs::read_dir(dir.path().join("meta")).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path(), "file://cache");
        let err = store.get("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, ExportError::Storage(_)));
        assert!(store.get("/abs.json").await.is_err());
    }
}
