use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A stored event photo: a unique, stable storage key and the URL it is
/// served from (derived from the key by the object store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub key: String,
    pub url: String,
}

impl Image {
    pub fn new(key: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            url: url.into(),
        }
    }
}

/// Bounding box for a detected face, in coordinates relative to the image
/// (all values in 0.0..=1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Opaque face identifier issued by the recognition service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaceId(pub String);

impl FaceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FaceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One detected face: issued by the recognition service during indexing,
/// never mutated afterwards. Multiple records may reference the same image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceRecord {
    pub face_id: FaceId,
    pub bounding_box: Option<BoundingBox>,
    /// The image this face was detected in.
    pub image: Image,
}

/// Opaque, process-generated token identifying one inferred person-cluster.
///
/// Serial ids (`g<N>`) come from the per-face strategy's monotonic counter and
/// are regenerated on every grouping pass. Minted ids
/// (`group_<millis>_<suffix>`) come from the whole-image strategy and double
/// as the external tag attached to indexed faces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl GroupId {
    /// Serial id from the per-face strategy's counter.
    pub fn serial(n: u64) -> Self {
        Self(format!("g{n}"))
    }

    /// Adopt an external tag recovered from a whole-image match.
    pub fn tag(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One inferred person-cluster: the member faces (empty under the whole-image
/// strategy) and the member images in first-seen order, deduplicated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub faces: Vec<FaceRecord>,
    pub images: Vec<Image>,
}

impl Group {
    pub fn new(id: GroupId) -> Self {
        Self {
            id,
            faces: Vec::new(),
            images: Vec::new(),
        }
    }

    /// Append an image unless the group already holds it.
    pub fn push_image(&mut self, image: &Image) {
        if !self.images.iter().any(|i| i.key == image.key) {
            self.images.push(image.clone());
        }
    }
}

/// The group partition published to the presentation layer: every known image
/// appears either in the union of group member lists or in `ungrouped`, never
/// in both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupPartition {
    pub groups: Vec<Group>,
    pub ungrouped: Vec<Image>,
}

impl GroupPartition {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.ungrouped.is_empty()
    }

    pub fn contains_image(&self, key: &str) -> bool {
        self.ungrouped.iter().any(|i| i.key == key)
            || self.groups.iter().any(|g| g.images.iter().any(|i| i.key == key))
    }

    /// Retract an image from every group and from the ungrouped bucket.
    /// Groups left with zero member images are pruned; groups with at least
    /// one remaining member survive.
    pub fn remove_image(&mut self, key: &str) {
        self.ungrouped.retain(|i| i.key != key);
        for group in &mut self.groups {
            group.images.retain(|i| i.key != key);
            group.faces.retain(|f| f.image.key != key);
        }
        self.groups.retain(|g| !g.images.is_empty());
    }

    /// Whether this partition covers exactly the given image set: every input
    /// image appears somewhere, nothing else appears, and no image sits in
    /// both a group and the ungrouped bucket.
    pub fn is_partition_of<'a>(&self, images: impl IntoIterator<Item = &'a Image>) -> bool {
        let expected: HashSet<&str> = images.into_iter().map(|i| i.key.as_str()).collect();
        let grouped: HashSet<&str> = self
            .groups
            .iter()
            .flat_map(|g| g.images.iter())
            .map(|i| i.key.as_str())
            .collect();
        let ungrouped: HashSet<&str> = self.ungrouped.iter().map(|i| i.key.as_str()).collect();
        if !grouped.is_disjoint(&ungrouped) {
            return false;
        }
        let covered: HashSet<&str> = grouped.union(&ungrouped).copied().collect();
        covered == expected
    }
}
