//! Scripted in-memory recognition gateway for tests.
//!
//! Behaves like the real service in the ways the engine depends on: searches
//! only report counterparts that were indexed earlier (by this pass or a
//! previous one), results come back most similar first, and whole-image
//! matches report the tag the counterpart is currently indexed under.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::recognition::{
    FaceMatch, ImageMatch, IndexedFace, RecognitionError, RecognitionGateway,
};
use crate::types::{FaceId, Image};

#[derive(Default)]
struct State {
    collections: HashSet<String>,
    indexed_faces: HashSet<FaceId>,
    /// Image key -> the external tag it was last indexed under.
    tags: HashMap<String, String>,
    index_calls: usize,
}

/// Configurable [`RecognitionGateway`] double.
#[derive(Default)]
pub struct ScriptedRecognition {
    faces_by_image: HashMap<String, Vec<FaceId>>,
    /// Symmetric pairwise similarity between face ids, in percent.
    face_pairs: Vec<(FaceId, FaceId, f32)>,
    /// Symmetric pairwise similarity between image keys, in percent.
    image_pairs: Vec<(String, String, f32)>,
    fail_index: HashSet<String>,
    fail_face_search: HashSet<FaceId>,
    fail_image_search: HashSet<String>,
    fail_ensure: bool,
    state: Mutex<State>,
}

impl ScriptedRecognition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the faces detected in one image.
    pub fn with_faces(mut self, image_key: &str, face_ids: &[&str]) -> Self {
        self.faces_by_image.insert(
            image_key.to_string(),
            face_ids.iter().map(|id| FaceId::from(*id)).collect(),
        );
        self
    }

    /// Script a symmetric similarity between two face ids.
    pub fn with_similar_faces(mut self, a: &str, b: &str, similarity: f32) -> Self {
        self.face_pairs
            .push((FaceId::from(a), FaceId::from(b), similarity));
        self
    }

    /// Script a symmetric similarity between two image keys.
    pub fn with_similar_images(mut self, a: &str, b: &str, similarity: f32) -> Self {
        self.image_pairs
            .push((a.to_string(), b.to_string(), similarity));
        self
    }

    /// Make `index_faces` fail for one image key.
    pub fn failing_index(mut self, image_key: &str) -> Self {
        self.fail_index.insert(image_key.to_string());
        self
    }

    /// Make `search_by_face_id` fail for one face id.
    pub fn failing_search(mut self, face_id: &str) -> Self {
        self.fail_face_search.insert(FaceId::from(face_id));
        self
    }

    /// Make `search_by_image` fail for one image key.
    pub fn failing_image_search(mut self, image_key: &str) -> Self {
        self.fail_image_search.insert(image_key.to_string());
        self
    }

    /// Make `ensure_collection` fail.
    pub fn failing_ensure(mut self) -> Self {
        self.fail_ensure = true;
        self
    }

    /// Number of `index_faces` calls observed, successful or not.
    pub fn index_calls(&self) -> usize {
        self.state.lock().unwrap().index_calls
    }

    pub fn collection_exists(&self, collection_id: &str) -> bool {
        self.state.lock().unwrap().collections.contains(collection_id)
    }
}

#[async_trait]
impl RecognitionGateway for ScriptedRecognition {
    async fn ensure_collection(&self, collection_id: &str) -> Result<(), RecognitionError> {
        if self.fail_ensure {
            return Err(RecognitionError::Service("ensure collection refused".into()));
        }
        self.state
            .lock()
            .unwrap()
            .collections
            .insert(collection_id.to_string());
        Ok(())
    }

    async fn index_faces(
        &self,
        _collection_id: &str,
        image: &Image,
        external_tag: &str,
    ) -> Result<Vec<IndexedFace>, RecognitionError> {
        let mut state = self.state.lock().unwrap();
        state.index_calls += 1;
        if self.fail_index.contains(&image.key) {
            return Err(RecognitionError::Service(format!(
                "index refused for {}",
                image.key
            )));
        }
        state.tags.insert(image.key.clone(), external_tag.to_string());
        let faces = self
            .faces_by_image
            .get(&image.key)
            .cloned()
            .unwrap_or_default();
        for id in &faces {
            state.indexed_faces.insert(id.clone());
        }
        Ok(faces
            .into_iter()
            .map(|face_id| IndexedFace {
                face_id,
                bounding_box: None,
            })
            .collect())
    }

    async fn search_by_face_id(
        &self,
        _collection_id: &str,
        face_id: &FaceId,
        max_results: usize,
        threshold: f32,
    ) -> Result<Vec<FaceMatch>, RecognitionError> {
        if self.fail_face_search.contains(face_id) {
            return Err(RecognitionError::Service(format!(
                "search refused for {face_id}"
            )));
        }
        let state = self.state.lock().unwrap();
        let mut matches: Vec<FaceMatch> = self
            .face_pairs
            .iter()
            .filter_map(|(a, b, similarity)| {
                let other = if a == face_id {
                    b
                } else if b == face_id {
                    a
                } else {
                    return None;
                };
                (*similarity >= threshold && state.indexed_faces.contains(other)).then(|| {
                    FaceMatch {
                        face_id: other.clone(),
                        similarity: *similarity,
                    }
                })
            })
            .collect();
        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        matches.truncate(max_results);
        Ok(matches)
    }

    async fn search_by_image(
        &self,
        _collection_id: &str,
        image: &Image,
        max_results: usize,
        threshold: f32,
    ) -> Result<Vec<ImageMatch>, RecognitionError> {
        if self.fail_image_search.contains(&image.key) {
            return Err(RecognitionError::Service(format!(
                "image search refused for {}",
                image.key
            )));
        }
        let state = self.state.lock().unwrap();
        let mut matches = Vec::new();
        // A previously indexed copy of the image itself is a perfect match.
        if let Some(tag) = state.tags.get(&image.key) {
            matches.push(ImageMatch {
                external_tag: tag.clone(),
                similarity: 100.0,
            });
        }
        for (a, b, similarity) in &self.image_pairs {
            let other = if *a == image.key {
                b
            } else if *b == image.key {
                a
            } else {
                continue;
            };
            if *similarity < threshold {
                continue;
            }
            if let Some(tag) = state.tags.get(other) {
                matches.push(ImageMatch {
                    external_tag: tag.clone(),
                    similarity: *similarity,
                });
            }
        }
        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        matches.truncate(max_results);
        Ok(matches)
    }
}
