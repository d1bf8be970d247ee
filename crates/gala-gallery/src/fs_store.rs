//! Filesystem-backed object store for local deployments and tests.
//!
//! Object bytes live at `<root>/<key>`; content type and upload metadata live
//! in a `<key>.meta.json` sidecar.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{ObjectMeta, ObjectStore, StorageError};

const SIDECAR_SUFFIX: &str = ".meta.json";

#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    content_type: String,
    metadata: HashMap<String, String>,
}

pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Content type and metadata recorded at upload time, if the object has a
    /// sidecar.
    pub async fn stored_metadata(
        &self,
        key: &str,
    ) -> Result<Option<HashMap<String, String>>, StorageError> {
        let path = self.path_for(&format!("{key}{SIDECAR_SUFFIX}"));
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let sidecar: Sidecar = serde_json::from_slice(&bytes).map_err(|e| {
                    StorageError::List {
                        prefix: key.to_string(),
                        reason: format!("corrupt sidecar: {e}"),
                    }
                })?;
                Ok(Some(sidecar.metadata))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl ObjectStore for FsStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StorageError> {
        let dir = self.path_for(prefix);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            // An event with no uploads has no directory yet.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut objects = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(SIDECAR_SUFFIX) || !entry.file_type().await?.is_file() {
                continue;
            }
            let meta = entry.metadata().await?;
            objects.push(ObjectMeta {
                key: format!("{prefix}{name}"),
                size: meta.len(),
                last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
            });
        }
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        let sidecar = Sidecar {
            content_type: content_type.to_string(),
            metadata,
        };
        let sidecar_path = self.path_for(&format!("{key}{SIDECAR_SUFFIX}"));
        let body = serde_json::to_vec_pretty(&sidecar).map_err(|e| StorageError::List {
            prefix: key.to_string(),
            reason: format!("sidecar encode: {e}"),
        })?;
        tokio::fs::write(&sidecar_path, body).await?;
        tracing::debug!(key, path = %path.display(), "object stored");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(err) => return Err(err.into()),
        }
        // Sidecar may legitimately be absent.
        let _ = tokio::fs::remove_file(self.path_for(&format!("{key}{SIDECAR_SUFFIX}"))).await;
        tracing::debug!(key, "object deleted");
        Ok(())
    }

    fn url_for(&self, key: &str) -> String {
        format!("file://{}", self.root.join(Path::new(key)).display())
    }
}
