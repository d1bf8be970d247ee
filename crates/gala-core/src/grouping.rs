//! Per-face strategy: search every indexed face for matches and fold the
//! results into a group partition.

use std::collections::HashMap;

use futures::future::join_all;

use crate::indexer::index_images;
use crate::ledger::GroupLedger;
use crate::recognition::RecognitionGateway;
use crate::types::{FaceId, FaceRecord, Group, GroupId, GroupPartition, Image};

/// Resolve a group for every face, searching concurrently.
///
/// Each face's assignment is computed the moment its own search settles,
/// consulting only the faces resolved so far (see [`GroupLedger`]). A failed
/// search is treated exactly like "no matches": the face gets its own fresh
/// group and the pass continues.
pub async fn assign_groups(
    gateway: &dyn RecognitionGateway,
    collection_id: &str,
    faces: &[FaceRecord],
    threshold: f32,
    max_matches: usize,
) -> HashMap<FaceId, GroupId> {
    let ledger = GroupLedger::new();
    let searches = faces.iter().map(|face| {
        let ledger = &ledger;
        async move {
            let matches = match gateway
                .search_by_face_id(collection_id, &face.face_id, max_matches, threshold)
                .await
            {
                Ok(matches) => matches,
                Err(err) => {
                    tracing::warn!(
                        face = %face.face_id,
                        image = %face.image.key,
                        error = %err,
                        "face search failed; assigning a fresh group"
                    );
                    Vec::new()
                }
            };
            ledger.resolve(&face.face_id, &matches);
        }
    });
    join_all(searches).await;
    ledger.into_assignments()
}

/// Bucket faces by their resolved group in one pass, first-seen order within
/// each bucket, then put every image with no detected face in `ungrouped`.
pub fn build_partition(
    images: &[Image],
    faces: &[FaceRecord],
    assignments: &HashMap<FaceId, GroupId>,
) -> GroupPartition {
    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<GroupId, usize> = HashMap::new();
    for face in faces {
        let Some(group_id) = assignments.get(&face.face_id) else {
            // Unassigned faces cannot occur in a completed pass; skip rather
            // than invent a bucket.
            tracing::warn!(face = %face.face_id, "face missing from assignments");
            continue;
        };
        let slot = *index.entry(group_id.clone()).or_insert_with(|| {
            groups.push(Group::new(group_id.clone()));
            groups.len() - 1
        });
        groups[slot].faces.push(face.clone());
        groups[slot].push_image(&face.image);
    }

    let ungrouped = images
        .iter()
        .filter(|image| !faces.iter().any(|f| f.image.key == image.key))
        .cloned()
        .collect();

    GroupPartition { groups, ungrouped }
}

/// Run the full per-face pass: index every image, search every face, fold.
pub async fn group_per_face(
    gateway: &dyn RecognitionGateway,
    collection_id: &str,
    images: &[Image],
    threshold: f32,
    max_matches: usize,
) -> GroupPartition {
    let faces = index_images(gateway, collection_id, images).await;
    tracing::debug!(
        collection = collection_id,
        images = images.len(),
        faces = faces.len(),
        "indexing phase complete"
    );
    let assignments = assign_groups(gateway, collection_id, &faces, threshold, max_matches).await;
    build_partition(images, &faces, &assignments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::ScriptedRecognition;
    use crate::{DEFAULT_MAX_MATCHES, DEFAULT_SIMILARITY_THRESHOLD};

    fn img(key: &str) -> Image {
        Image::new(key, format!("https://cdn.test/{key}"))
    }

    async fn run(gateway: &ScriptedRecognition, images: &[Image]) -> GroupPartition {
        group_per_face(
            gateway,
            "event-1",
            images,
            DEFAULT_SIMILARITY_THRESHOLD,
            DEFAULT_MAX_MATCHES,
        )
        .await
    }

    #[tokio::test]
    async fn shared_face_merges_and_distinct_face_separates() {
        // A and B show the same person (95%); C shows someone else (10%).
        let gateway = ScriptedRecognition::new()
            .with_faces("a.jpg", &["fa"])
            .with_faces("b.jpg", &["fb"])
            .with_faces("c.jpg", &["fc"])
            .with_similar_faces("fa", "fb", 95.0)
            .with_similar_faces("fa", "fc", 10.0)
            .with_similar_faces("fb", "fc", 10.0);
        let images = [img("a.jpg"), img("b.jpg"), img("c.jpg")];

        let partition = run(&gateway, &images).await;
        assert!(partition.is_partition_of(&images));
        assert_eq!(partition.groups.len(), 2);
        let ab = partition
            .groups
            .iter()
            .find(|g| g.images.iter().any(|i| i.key == "a.jpg"))
            .unwrap();
        assert!(ab.images.iter().any(|i| i.key == "b.jpg"));
        let c = partition
            .groups
            .iter()
            .find(|g| g.images.iter().any(|i| i.key == "c.jpg"))
            .unwrap();
        assert_eq!(c.images.len(), 1);
    }

    #[tokio::test]
    async fn failed_search_isolates_that_face_only() {
        let gateway = ScriptedRecognition::new()
            .with_faces("a.jpg", &["fa"])
            .with_faces("b.jpg", &["fb"])
            .with_faces("c.jpg", &["fc"])
            .failing_search("fb");
        let images = [img("a.jpg"), img("b.jpg"), img("c.jpg")];

        let partition = run(&gateway, &images).await;
        assert!(partition.is_partition_of(&images));
        // No similarity scripted and B's search fails: three separate groups.
        assert_eq!(partition.groups.len(), 3);
    }

    #[tokio::test]
    async fn faceless_images_land_in_ungrouped() {
        let gateway = ScriptedRecognition::new().with_faces("a.jpg", &["fa"]);
        let images = [img("a.jpg"), img("scenery.jpg")];

        let partition = run(&gateway, &images).await;
        assert!(partition.is_partition_of(&images));
        assert_eq!(partition.ungrouped.len(), 1);
        assert_eq!(partition.ungrouped[0].key, "scenery.jpg");
    }

    #[tokio::test]
    async fn image_with_two_people_appears_in_both_groups() {
        // duo.jpg shows both the person from a.jpg and the person from c.jpg.
        let gateway = ScriptedRecognition::new()
            .with_faces("a.jpg", &["fa"])
            .with_faces("c.jpg", &["fc"])
            .with_faces("duo.jpg", &["fd1", "fd2"])
            .with_similar_faces("fa", "fd1", 93.0)
            .with_similar_faces("fc", "fd2", 91.0);
        let images = [img("a.jpg"), img("c.jpg"), img("duo.jpg")];

        let partition = run(&gateway, &images).await;
        let holding_duo: Vec<_> = partition
            .groups
            .iter()
            .filter(|g| g.images.iter().any(|i| i.key == "duo.jpg"))
            .collect();
        assert_eq!(holding_duo.len(), 2);
        // Within each group the image appears once.
        for group in holding_duo {
            assert_eq!(
                group.images.iter().filter(|i| i.key == "duo.jpg").count(),
                1
            );
        }
    }

    #[tokio::test]
    async fn rerun_with_same_evidence_is_isomorphic() {
        let gateway = ScriptedRecognition::new()
            .with_faces("a.jpg", &["fa"])
            .with_faces("b.jpg", &["fb"])
            .with_similar_faces("fa", "fb", 95.0);
        let images = [img("a.jpg"), img("b.jpg")];

        let first = run(&gateway, &images).await;
        let second = run(&gateway, &images).await;
        assert_eq!(first.groups.len(), second.groups.len());
        for (a, b) in first.groups.iter().zip(&second.groups) {
            let ka: Vec<_> = a.images.iter().map(|i| &i.key).collect();
            let kb: Vec<_> = b.images.iter().map(|i| &i.key).collect();
            assert_eq!(ka, kb);
        }
    }
}
