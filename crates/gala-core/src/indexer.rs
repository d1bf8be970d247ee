//! Phase 1 of the per-face strategy: submit every image for face indexing.

use futures::future::join_all;

use crate::recognition::RecognitionGateway;
use crate::types::{FaceRecord, Image};

/// Index every image concurrently and collect the detected faces into a flat
/// list tagged with their source image.
///
/// Best-effort by design: an image whose `index_faces` call fails contributes
/// zero faces and never fails the batch. No ordering is guaranteed between
/// images; the returned list follows the input image order because results
/// are collected per input slot.
pub async fn index_images(
    gateway: &dyn RecognitionGateway,
    collection_id: &str,
    images: &[Image],
) -> Vec<FaceRecord> {
    let per_image = images.iter().map(|image| async move {
        match gateway
            .index_faces(collection_id, image, &image.key)
            .await
        {
            Ok(indexed) => indexed
                .into_iter()
                .map(|f| FaceRecord {
                    face_id: f.face_id,
                    bounding_box: f.bounding_box,
                    image: image.clone(),
                })
                .collect(),
            Err(err) => {
                tracing::warn!(image = %image.key, error = %err, "indexing failed; treating as no faces");
                Vec::new()
            }
        }
    });

    join_all(per_image).await.into_iter().flatten().collect()
}
