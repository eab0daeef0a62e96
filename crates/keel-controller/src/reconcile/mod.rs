//! Ownership reconciliation.
//!
//! Computes the objects one owner's load result calls for and syncs the
//! store to match:
//! - disable sources per manifest ([`to_disable_sources`])
//! - the desired object set ([`to_api_objects`])
//! - the three-way sync against live objects ([`update_owned_objects`])

mod disable;
mod engine;
mod merge;
mod objects;
mod registry;
mod report;

pub use disable::{DisableSourceMap, disable_object_name, to_disable_sources};
pub use engine::update_owned_objects;
pub use objects::{
    DesiredObjectSet, OWNER_LABEL, OwnerRecord, owner_scope, owner_selector, to_api_objects,
};
pub use registry::{RECONCILED_KINDS, is_reconciled};
pub use report::{ReconcileError, ReconcileFailure, ReconcileOp, ReconcileReport};
