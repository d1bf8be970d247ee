//! Whole-image strategy: search each image as a whole, adopt the tag of the
//! best match, and index the image under the resolved tag so later passes
//! (and later uploads) can resolve against it.

use std::collections::HashMap;

use chrono::Utc;
use futures::future::join_all;
use uuid::Uuid;

use crate::recognition::RecognitionGateway;
use crate::types::{Group, GroupId, GroupPartition, Image};

/// Mint a fresh whole-image group tag. Collision probability is negligible
/// for event-scale volumes.
pub fn mint_tag() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("group_{}_{}", Utc::now().timestamp_millis(), &suffix[..8])
}

/// Resolve a tag for one image: adopt the first match whose tag differs from
/// the image's own storage key, else mint. The index step always runs, even
/// on a match, so the collection stays populated for future passes; an index
/// failure only degrades future resolution, never this image's tag.
async fn resolve_tag(
    gateway: &dyn RecognitionGateway,
    collection_id: &str,
    image: &Image,
    threshold: f32,
    max_matches: usize,
) -> String {
    let matches = match gateway
        .search_by_image(collection_id, image, max_matches, threshold)
        .await
    {
        Ok(matches) => matches,
        Err(err) => {
            tracing::warn!(image = %image.key, error = %err, "image search failed; minting a fresh group");
            Vec::new()
        }
    };
    let tag = matches
        .iter()
        .find(|m| m.external_tag != image.key)
        .map(|m| m.external_tag.clone())
        .unwrap_or_else(mint_tag);

    if let Err(err) = gateway.index_faces(collection_id, image, &tag).await {
        tracing::warn!(image = %image.key, tag = %tag, error = %err, "indexing under resolved tag failed");
    }
    tag
}

/// Assemble the partition from resolved tags, preserving input image order:
/// a tag shared by two or more images becomes a group; images whose tag
/// attracted no one else stay ungrouped.
pub fn partition_by_tag(resolved: &[(Image, String)]) -> GroupPartition {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (_, tag) in resolved {
        *counts.entry(tag.as_str()).or_default() += 1;
    }

    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut ungrouped = Vec::new();
    for (image, tag) in resolved {
        if counts[tag.as_str()] < 2 {
            ungrouped.push(image.clone());
            continue;
        }
        let slot = *index.entry(tag.as_str()).or_insert_with(|| {
            groups.push(Group::new(GroupId::tag(tag.clone())));
            groups.len() - 1
        });
        groups[slot].push_image(image);
    }

    GroupPartition { groups, ungrouped }
}

/// Run the full whole-image pass concurrently over the image set.
pub async fn group_whole_image(
    gateway: &dyn RecognitionGateway,
    collection_id: &str,
    images: &[Image],
    threshold: f32,
    max_matches: usize,
) -> GroupPartition {
    let resolutions = images.iter().map(|image| async move {
        let tag = resolve_tag(gateway, collection_id, image, threshold, max_matches).await;
        (image.clone(), tag)
    });
    let resolved = join_all(resolutions).await;
    tracing::debug!(
        collection = collection_id,
        images = resolved.len(),
        "whole-image resolution complete"
    );
    partition_by_tag(&resolved)
}
