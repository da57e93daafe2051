//! # Merge Engine
//!
//! Read-modify-write merging of a partial update onto a freshly fetched
//! record. Dradis replaces the whole field block on every write, so a
//! partial update has to be folded into the current fields before it is
//! encoded.
//!
//! Blank and null update values are no-ops. A field therefore cannot be
//! cleared through a merge; it keeps its snapshot value.

use crate::fields::FieldMap;
use serde_json::Value;

/// Whether an update value carries content that should replace the
/// snapshot's value.
///
/// Text counts only when something other than whitespace remains after
/// trimming. Any non-null, non-text value counts.
pub fn carries_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// Fold `update` onto a copy of `snapshot`.
///
/// Keys only in the snapshot pass through, keys only in the update are
/// appended in update order, and shared keys take the update's value when
/// [`carries_content`] holds. The snapshot itself is left untouched.
pub fn merge(snapshot: &FieldMap, update: &FieldMap) -> FieldMap {
    let mut merged = snapshot.clone();
    for (name, value) in update {
        if carries_content(value) {
            merged.insert(name.clone(), value.clone());
        }
    }
    merged
}

// =============================================================================
// TESTS
// =============================================================================
