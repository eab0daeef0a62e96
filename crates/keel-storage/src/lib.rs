//! # keel-storage
//!
//! Object store abstraction layer for the Keel reconciler.
//!
//! This crate defines the object model and the [`ObjectStore`] trait that all
//! backends implement. It does not contain any implementations - those are
//! provided by separate crates.
//!
//! ## Overview
//!
//! - [`ObjectKind`] names every kind of object the reconciler can produce.
//! - [`ApiObject`] pairs [`ObjectMeta`] with a typed [`ObjectSpec`].
//! - [`ObjectStore`] offers get/list/create/update/delete with optimistic
//!   versioning on update and mandatory label scoping on list.
//!
//! ## Example
//!
//! ```ignore
//! use keel_storage::{LabelSelector, ListParams, ObjectKind, ObjectStore};
//!
//! async fn owned_configmaps(store: &dyn ObjectStore, owner: &str) -> usize {
//!     let params = ListParams::new(LabelSelector::new().with_label("keel.dev/owner", owner));
//!     store.list(ObjectKind::ConfigMap, &params).await.map(|v| v.len()).unwrap_or(0)
//! }
//! ```

mod error;
pub mod spec;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use spec::{
    ButtonStateSpec, CmdImageSpec, CmdSpec, ConfigMapDisableSource, ConfigMapSpec,
    ConfigMapStateSource, DISABLE_KEY, DisableResourceStatus, DisableSource,
    DockerComposeServiceSpec, DockerImageSpec, FileWatchSpec, ImageMapSpec, KubernetesApplySpec,
    ObjectSpec, StateSource, ToggleButtonSpec, UiComponentLocation, UiResourceSpec,
};
pub use traits::ObjectStore;
pub use types::{ApiObject, LabelSelector, ListParams, ObjectKind, ObjectMeta, ObjectRef};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shareable store trait object.
pub type DynObjectStore = std::sync::Arc<dyn ObjectStore>;
