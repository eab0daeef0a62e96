//! Payload-preserving merge for objects other actors may write to.

use keel_storage::{ObjectSpec, StorageError};
use serde_json::Value;

/// Merges `live` over `desired`: every value already in the store is kept,
/// and desired values only fill keys the store does not have yet.
pub(crate) fn merge_preserving_live(
    desired: &ObjectSpec,
    live: &ObjectSpec,
) -> Result<ObjectSpec, StorageError> {
    let mut merged = serde_json::to_value(desired)?;
    deep_merge(&mut merged, serde_json::to_value(live)?);
    Ok(serde_json::from_value(merged)?)
}

/// Recursively merges `right` into `left`; `right` wins on conflicts.
fn deep_merge(left: &mut Value, right: Value) {
    match (left, right) {
        (Value::Object(left_map), Value::Object(right_map)) => {
            for (key, right_value) in right_map {
                if let Some(left_value) = left_map.get_mut(&key) {
                    deep_merge(left_value, right_value);
                } else {
                    left_map.insert(key, right_value);
                }
            }
        }
        (left, right) => {
            *left = right;
        }
    }
}
