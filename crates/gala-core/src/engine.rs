//! Strategy selection and the one entry point for a grouping pass.

use std::sync::Arc;

use crate::grouping::group_per_face;
use crate::recognition::RecognitionGateway;
use crate::types::{GroupPartition, Image};
use crate::whole_image::group_whole_image;
use crate::{DEFAULT_MAX_MATCHES, DEFAULT_SIMILARITY_THRESHOLD};

/// How a pass reconciles images into person groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingStrategy {
    /// Index every image's faces, then search per face id.
    PerFace,
    /// Search each whole image, then index it under the resolved tag.
    WholeImage,
}

#[derive(Debug, Clone, Copy)]
pub struct GroupingConfig {
    pub strategy: GroupingStrategy,
    /// Match threshold in percent (0-100).
    pub similarity_threshold: f32,
    /// Result cap per search call.
    pub max_matches: usize,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            strategy: GroupingStrategy::PerFace,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_matches: DEFAULT_MAX_MATCHES,
        }
    }
}

/// Runs grouping passes against one recognition backend.
pub struct GroupingEngine {
    gateway: Arc<dyn RecognitionGateway>,
    config: GroupingConfig,
}

impl GroupingEngine {
    pub fn new(gateway: Arc<dyn RecognitionGateway>, config: GroupingConfig) -> Self {
        Self { gateway, config }
    }

    pub fn config(&self) -> &GroupingConfig {
        &self.config
    }

    /// Run one full grouping pass over the image set.
    ///
    /// Infallible: a missing collection or any individual recognition failure
    /// degrades clustering for the affected images and is handled inside the
    /// pass; callers always receive a complete partition of the input.
    pub async fn group(&self, collection_id: &str, images: &[Image]) -> GroupPartition {
        if let Err(err) = self.gateway.ensure_collection(collection_id).await {
            tracing::warn!(collection = collection_id, error = %err, "ensure-collection failed; continuing");
        }
        let partition = match self.config.strategy {
            GroupingStrategy::PerFace => {
                group_per_face(
                    self.gateway.as_ref(),
                    collection_id,
                    images,
                    self.config.similarity_threshold,
                    self.config.max_matches,
                )
                .await
            }
            GroupingStrategy::WholeImage => {
                group_whole_image(
                    self.gateway.as_ref(),
                    collection_id,
                    images,
                    self.config.similarity_threshold,
                    self.config.max_matches,
                )
                .await
            }
        };
        tracing::info!(
            collection = collection_id,
            images = images.len(),
            groups = partition.groups.len(),
            ungrouped = partition.ungrouped.len(),
            "grouping pass complete"
        );
        partition
    }
}
