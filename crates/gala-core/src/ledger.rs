//! Single owner of the group counter and the face-to-group mapping.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::recognition::FaceMatch;
use crate::types::{FaceId, GroupId};

#[derive(Default)]
struct Inner {
    next: u64,
    by_face: HashMap<FaceId, GroupId>,
}

/// Shared mutable state of a per-face grouping pass.
///
/// All concurrently-resolving search callbacks funnel through [`resolve`],
/// which holds the lock for one map probe so each assignment is a single
/// atomic write. Reads of "is this matched face already resolved" see
/// whatever assignments have landed so far; two mutual matches may therefore
/// both mint fresh groups before either sees the other. That race is an
/// accepted approximation of the sequential algorithm, traded for running the
/// whole batch concurrently.
///
/// [`resolve`]: GroupLedger::resolve
#[derive(Default)]
pub struct GroupLedger {
    inner: Mutex<Inner>,
}

impl GroupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a group to `face_id` given its search matches, most similar
    /// first. Adopts the group of the first matched face that already has
    /// one; otherwise mints a fresh serial group. A failed search is passed
    /// in as an empty match list and mints.
    pub fn resolve(&self, face_id: &FaceId, matches: &[FaceMatch]) -> GroupId {
        let mut inner = self.inner.lock().expect("ledger mutex poisoned");
        let group = matches
            .iter()
            .find_map(|m| inner.by_face.get(&m.face_id).cloned())
            .unwrap_or_else(|| {
                inner.next += 1;
                GroupId::serial(inner.next)
            });
        inner.by_face.insert(face_id.clone(), group.clone());
        group
    }

    /// The finished face-to-group mapping for partition assembly.
    pub fn into_assignments(self) -> HashMap<FaceId, GroupId> {
        self.inner.into_inner().expect("ledger mutex poisoned").by_face
    }
}
