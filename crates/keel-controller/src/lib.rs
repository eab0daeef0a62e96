//! Keel ownership reconciler.
//!
//! Given the load result of one owner's configuration, computes the objects
//! that should exist and syncs an [`ObjectStore`](keel_storage::ObjectStore)
//! to match, touching only objects labeled as belonging to that owner.

pub mod config;
pub mod locks;
pub mod observability;
pub mod reconcile;
pub mod reconciler;

pub use config::KeelConfig;
pub use locks::OwnerLocks;
pub use observability::init_tracing;
pub use reconcile::{
    OwnerRecord, ReconcileError, ReconcileFailure, ReconcileOp, ReconcileReport,
    update_owned_objects,
};
pub use reconciler::Reconciler;
