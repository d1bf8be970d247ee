//! Capability seam over the external face-recognition service.
//!
//! The engine never talks to a concrete backend; it sees four operations on
//! named collections. One collection is kept per event, with the event id as
//! the collection id.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{BoundingBox, FaceId, Image};

#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error("recognition service call failed: {0}")]
    Service(String),
    #[error("collection not found: {0}")]
    CollectionMissing(String),
}

/// One face detected and registered by `index_faces`.
#[derive(Debug, Clone)]
pub struct IndexedFace {
    pub face_id: FaceId,
    pub bounding_box: Option<BoundingBox>,
}

/// One hit from `search_by_face_id`, ordered by descending similarity.
#[derive(Debug, Clone)]
pub struct FaceMatch {
    pub face_id: FaceId,
    /// Similarity in percent (0-100).
    pub similarity: f32,
}

/// One hit from `search_by_image`: the external tag the matched face was
/// indexed under, ordered by descending similarity.
#[derive(Debug, Clone)]
pub struct ImageMatch {
    pub external_tag: String,
    pub similarity: f32,
}

/// External face-recognition capability.
///
/// Every call is fallible and callers handle failure locally: a failed index
/// or search degrades clustering for that one image or face and never aborts
/// a grouping pass.
#[async_trait]
pub trait RecognitionGateway: Send + Sync {
    /// Create the named collection if it does not exist. Idempotent.
    async fn ensure_collection(&self, collection_id: &str) -> Result<(), RecognitionError>;

    /// Detect and register the faces found in one image, tagging them with
    /// `external_tag`. Returns an empty list when no face is detected.
    async fn index_faces(
        &self,
        collection_id: &str,
        image: &Image,
        external_tag: &str,
    ) -> Result<Vec<IndexedFace>, RecognitionError>;

    /// Find previously indexed faces similar to an already-indexed face,
    /// above `threshold` percent, at most `max_results`, most similar first.
    async fn search_by_face_id(
        &self,
        collection_id: &str,
        face_id: &FaceId,
        max_results: usize,
        threshold: f32,
    ) -> Result<Vec<FaceMatch>, RecognitionError>;

    /// Find previously indexed faces similar to any face in a fresh (not yet
    /// indexed) image, reporting the tags they were indexed under.
    async fn search_by_image(
        &self,
        collection_id: &str,
        image: &Image,
        max_results: usize,
        threshold: f32,
    ) -> Result<Vec<ImageMatch>, RecognitionError>;
}
