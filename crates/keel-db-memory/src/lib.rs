//! In-memory object store backend for Keel.
//!
//! This crate provides an in-memory implementation of the `ObjectStore` trait
//! from `keel-storage`, using papaya lock-free HashMap for concurrent access.
//!
//! # Example
//!
//! ```ignore
//! use keel_db_memory::InMemoryObjectStore;
//! use keel_core::NamespacedName;
//! use keel_storage::{ApiObject, ConfigMapSpec, ObjectMeta, ObjectStore};
//!
//! let store = InMemoryObjectStore::new();
//! let toggle = ApiObject::new(
//!     ObjectMeta::new(&NamespacedName::named("fe-disable")),
//!     ConfigMapSpec::default().with_entry("isDisabled", "false"),
//! );
//! let created = store.create(&toggle).await?;
//! ```

pub mod storage;

// Re-export the ObjectStore trait for convenience
pub use keel_storage::{DynObjectStore, ObjectStore, StorageError};

pub use storage::{InMemoryObjectStore, StorageKey};

/// Creates a new in-memory object store instance.
pub fn create_object_store() -> DynObjectStore {
    std::sync::Arc::new(InMemoryObjectStore::new())
}
