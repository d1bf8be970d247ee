//! Participant upload flow with batch progress reporting.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::watch;

use gala_core::Image;

use crate::error::GalleryError;
use crate::storage::{image_key, ObjectStore};

/// Participant session context. Uploads to a shared event require one.
#[derive(Debug, Clone)]
pub struct Session {
    pub participant: String,
}

/// One file chosen for upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Upload a batch of files to an event, reporting percentage progress
/// (0-100, monotonic non-decreasing within the batch) on `progress`.
///
/// Without a session nothing is uploaded. A put failure is surfaced
/// immediately and not retried; files already stored stay stored.
pub async fn upload_batch(
    store: &dyn ObjectStore,
    event_id: &str,
    session: Option<&Session>,
    files: &[Upload],
    progress: &watch::Sender<u8>,
) -> Result<Vec<Image>, GalleryError> {
    let session = session.ok_or(GalleryError::AuthenticationRequired)?;

    let mut images = Vec::with_capacity(files.len());
    for (done, file) in files.iter().enumerate() {
        let key = image_key(event_id, Utc::now(), &file.file_name);
        let mut metadata = HashMap::new();
        metadata.insert("uploaded-by".to_string(), session.participant.clone());
        store
            .put(&key, file.bytes.clone(), &file.content_type, metadata)
            .await?;
        images.push(Image::new(key.clone(), store.url_for(&key)));
        let pct = ((done + 1) * 100 / files.len()) as u8;
        let _ = progress.send(pct);
        tracing::debug!(key, pct, "upload stored");
    }
    tracing::info!(
        event = event_id,
        uploaded = images.len(),
        participant = %session.participant,
        "upload batch complete"
    );
    Ok(images)
}
