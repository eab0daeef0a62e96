//! Storage traits for the object store abstraction layer.

use async_trait::async_trait;
use keel_core::NamespacedName;

use crate::error::StorageError;
use crate::types::{ApiObject, ListParams, ObjectKind};

/// The contract every object store backend must implement.
///
/// Each operation is atomic on its own; there is no multi-object transaction.
/// Implementations must be thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use keel_storage::{ObjectKind, ObjectStore, StorageError};
///
/// async fn yaml_of(store: &dyn ObjectStore, key: &NamespacedName) -> Result<String, StorageError> {
///     let obj = store.get(ObjectKind::KubernetesApply, key).await?;
///     match obj.spec {
///         ObjectSpec::KubernetesApply(spec) => Ok(spec.yaml),
///         _ => Err(StorageError::internal("kind mismatch")),
///     }
/// }
/// ```
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Reads one object.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no object of `kind` has that name.
    async fn get(&self, kind: ObjectKind, key: &NamespacedName) -> Result<ApiObject, StorageError>;

    /// Lists the objects of `kind` matching `params`.
    async fn list(&self, kind: ObjectKind, params: &ListParams)
    -> Result<Vec<ApiObject>, StorageError>;

    /// Creates a new object. The store assigns `resource_version` and
    /// `creation_timestamp`; any values passed in are ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if an object with the same kind and name exists.
    /// Returns `StorageError::InvalidObject` if the object has no name.
    async fn create(&self, object: &ApiObject) -> Result<ApiObject, StorageError>;

    /// Replaces an existing object if its stored version equals
    /// `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the object does not exist.
    /// Returns `StorageError::VersionConflict` if the stored version differs.
    async fn update(
        &self,
        object: &ApiObject,
        expected_version: &str,
    ) -> Result<ApiObject, StorageError>;

    /// Deletes one object.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the object does not exist.
    async fn delete(&self, kind: ObjectKind, key: &NamespacedName) -> Result<(), StorageError>;

    /// Returns the name of this backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test that ObjectStore is object-safe
    fn _assert_store_object_safe(_: &dyn ObjectStore) {}
}
