use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use keel_core::NamespacedName;
use keel_storage::{ApiObject, ListParams, ObjectKind, ObjectStore, StorageError};
use papaya::HashMap as PapayaHashMap;
use time::OffsetDateTime;

pub type StorageKey = String; // Format: "Kind/namespace/name"

pub(crate) fn make_storage_key(kind: ObjectKind, key: &NamespacedName) -> StorageKey {
    format!("{kind}/{}/{}", key.namespace, key.name)
}

/// In-memory object store using papaya lock-free HashMap.
///
/// Reads are lock-free. Writes that must check the current state first
/// (create, update, delete) are serialized by a single mutex so that the
/// existence and version checks are atomic with the write.
#[derive(Debug)]
pub struct InMemoryObjectStore {
    pub(crate) data: Arc<PapayaHashMap<StorageKey, ApiObject>>,
    /// Atomic counter for generating resource versions
    pub(crate) version_counter: AtomicU64,
    write_lock: Mutex<()>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            data: Arc::new(PapayaHashMap::new()),
            version_counter: AtomicU64::new(1),
            write_lock: Mutex::new(()),
        }
    }

    /// Generates the next resource version.
    pub(crate) fn next_version(&self) -> String {
        self.version_counter
            .fetch_add(1, Ordering::SeqCst)
            .to_string()
    }

    /// Number of objects currently stored, across all kinds.
    pub fn len(&self) -> usize {
        self.data.pin().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored object, sorted by kind, namespace and name.
    pub fn snapshot(&self) -> Vec<ApiObject> {
        let guard = self.data.pin();
        let mut objects: Vec<ApiObject> = guard.iter().map(|(_, obj)| obj.clone()).collect();
        objects.sort_by(|a, b| a.object_ref().cmp(&b.object_ref()));
        objects
    }

    fn lock_writes(&self) -> Result<std::sync::MutexGuard<'_, ()>, StorageError> {
        self.write_lock
            .lock()
            .map_err(|_| StorageError::internal("object store write lock poisoned"))
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, kind: ObjectKind, key: &NamespacedName) -> Result<ApiObject, StorageError> {
        let storage_key = make_storage_key(kind, key);
        let guard = self.data.pin();
        guard
            .get(&storage_key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(kind, key.to_string()))
    }

    async fn list(
        &self,
        kind: ObjectKind,
        params: &ListParams,
    ) -> Result<Vec<ApiObject>, StorageError> {
        let prefix = format!("{kind}/");
        let guard = self.data.pin();
        let mut objects: Vec<ApiObject> = guard
            .iter()
            .filter(|(key, obj)| key.starts_with(&prefix) && params.matches(&obj.metadata))
            .map(|(_, obj)| obj.clone())
            .collect();
        objects.sort_by(|a, b| a.metadata.key().cmp(&b.metadata.key()));
        Ok(objects)
    }

    async fn create(&self, object: &ApiObject) -> Result<ApiObject, StorageError> {
        if object.metadata.name.is_empty() {
            return Err(StorageError::invalid_object("metadata.name is required"));
        }
        let kind = object.kind();
        let key = object.key();
        let storage_key = make_storage_key(kind, &key);

        let mut stored = object.clone();
        stored.metadata.resource_version = Some(self.next_version());
        stored.metadata.creation_timestamp = Some(OffsetDateTime::now_utc());

        {
            let _write = self.lock_writes()?;
            let guard = self.data.pin();

            // Check for conflicts
            if guard.get(&storage_key).is_some() {
                return Err(StorageError::already_exists(kind, key.to_string()));
            }

            guard.insert(storage_key, stored.clone());
        }

        tracing::trace!(kind = %kind, name = %key, "object created");
        Ok(stored)
    }

    async fn update(
        &self,
        object: &ApiObject,
        expected_version: &str,
    ) -> Result<ApiObject, StorageError> {
        let kind = object.kind();
        let key = object.key();
        let storage_key = make_storage_key(kind, &key);

        let stored = {
            let _write = self.lock_writes()?;
            let guard = self.data.pin();

            let existing = guard
                .get(&storage_key)
                .ok_or_else(|| StorageError::not_found(kind, key.to_string()))?;

            let actual_version = existing.resource_version().unwrap_or_default();
            if actual_version != expected_version {
                return Err(StorageError::version_conflict(
                    expected_version,
                    actual_version,
                ));
            }

            let mut stored = object.clone();
            stored.metadata.resource_version = Some(self.next_version());
            stored.metadata.creation_timestamp = existing.metadata.creation_timestamp;
            guard.insert(storage_key, stored.clone());
            stored
        };

        tracing::trace!(kind = %kind, name = %key, "object updated");
        Ok(stored)
    }

    async fn delete(&self, kind: ObjectKind, key: &NamespacedName) -> Result<(), StorageError> {
        let storage_key = make_storage_key(kind, key);
        {
            let _write = self.lock_writes()?;
            let guard = self.data.pin();
            if guard.remove(&storage_key).is_none() {
                return Err(StorageError::not_found(kind, key.to_string()));
            }
        }

        tracing::trace!(kind = %kind, name = %key, "object deleted");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
