//! gala-core: face-grouping reconciliation for event photo galleries.
//!
//! Given an event's image set and an external face-recognition capability
//! ([`RecognitionGateway`]), assigns every image (or detected face) to a
//! stable group of photos believed to show the same person. Two strategies
//! are provided behind one engine: per-face indexing plus face-id search,
//! and whole-image search plus tagged indexing.

pub mod engine;
pub mod grouping;
pub mod indexer;
pub mod ledger;
pub mod recognition;
pub mod types;
pub mod whole_image;

#[cfg(any(test, feature = "test-utils"))]
pub mod testkit;

pub use engine::{GroupingConfig, GroupingEngine, GroupingStrategy};
pub use recognition::{
    FaceMatch, ImageMatch, IndexedFace, RecognitionError, RecognitionGateway,
};
pub use types::{BoundingBox, FaceId, FaceRecord, Group, GroupId, GroupPartition, Image};

/// Minimum similarity (percent) for two faces to be considered the same person.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 80.0;

/// Maximum matches requested per search call.
pub const DEFAULT_MAX_MATCHES: usize = 5;
