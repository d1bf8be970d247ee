//! Object-store capability and the event image listing policy.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use gala_core::Image;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("listing failed for prefix {prefix}: {reason}")]
    List { prefix: String, reason: String },
}

/// Metadata for one stored object.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// External object-store capability (upload, list, delete of image blobs).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StorageError>;

    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Derive the retrieval URL for a stored key.
    fn url_for(&self, key: &str) -> String;
}

/// Storage key for a newly uploaded event image.
pub fn image_key(event_id: &str, uploaded_at: DateTime<Utc>, file_name: &str) -> String {
    format!(
        "events/shared/{event_id}/images/{}-{file_name}",
        uploaded_at.timestamp_millis()
    )
}

/// Prefixes an event's images may live under: the shared prefix plus the
/// pre-sharing legacy layout.
pub fn image_prefixes(event_id: &str) -> [String; 2] {
    [
        format!("events/shared/{event_id}/images/"),
        format!("events/{event_id}/images/"),
    ]
}

/// List all images of an event across its prefixes.
///
/// A listing failure for one prefix is retained and re-raised only when no
/// prefix produced any image; if anything was listed, the partial failure is
/// logged and ignored.
pub async fn list_event_images(
    store: &dyn ObjectStore,
    event_id: &str,
) -> Result<Vec<Image>, StorageError> {
    let mut images = Vec::new();
    let mut first_error = None;
    for prefix in image_prefixes(event_id) {
        match store.list(&prefix).await {
            Ok(objects) => {
                images.extend(
                    objects
                        .into_iter()
                        .map(|o| Image::new(o.key.clone(), store.url_for(&o.key))),
                );
            }
            Err(err) => {
                tracing::warn!(prefix, error = %err, "listing failed for prefix");
                first_error.get_or_insert(err);
            }
        }
    }
    match first_error {
        Some(err) if images.is_empty() => Err(err),
        _ => Ok(images),
    }
}
