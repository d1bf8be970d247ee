//! Shared fixtures for the gallery integration tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use gala_core::Image;
use gala_gallery::{ObjectMeta, ObjectStore, StorageError};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

pub fn img(key: &str) -> Image {
    Image::new(key, format!("https://cdn.test/{key}"))
}

/// In-memory object store with scripted delete behavior.
#[derive(Default)]
pub struct MemStore {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_list: bool,
    pub fail_delete: bool,
    /// When set, `delete` waits for a permit before settling, so tests can
    /// observe the mid-deletion state.
    pub delete_gate: Option<Arc<Notify>>,
    pub deleted: Mutex<Vec<String>>,
}

impl MemStore {
    pub fn with_object(self, key: &str) -> Self {
        self.objects.lock().unwrap().insert(key.to_string(), vec![0u8; 3]);
        self
    }
}

#[async_trait]
impl ObjectStore for MemStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StorageError> {
        if self.fail_list {
            return Err(StorageError::List {
                prefix: prefix.to_string(),
                reason: "scripted listing failure".into(),
            });
        }
        let objects = self.objects.lock().unwrap();
        let mut metas: Vec<ObjectMeta> = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, bytes)| ObjectMeta {
                key: key.clone(),
                size: bytes.len() as u64,
                last_modified: None,
            })
            .collect();
        metas.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(metas)
    }

    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
        _metadata: HashMap<String, String>,
    ) -> Result<(), StorageError> {
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        if let Some(gate) = &self.delete_gate {
            gate.notified().await;
        }
        if self.fail_delete {
            return Err(StorageError::Io(std::io::Error::other(
                "scripted delete failure",
            )));
        }
        self.objects.lock().unwrap().remove(key);
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }

    fn url_for(&self, key: &str) -> String {
        format!("https://cdn.test/{key}")
    }
}
