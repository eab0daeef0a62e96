//! Three-way sync between desired and live objects of one owner.

use std::collections::BTreeMap;

use keel_core::{EngineMode, LoadResult, NamespacedName};
use keel_storage::{ApiObject, ListParams, ObjectKind, ObjectRef, ObjectSpec, ObjectStore};

use super::disable::to_disable_sources;
use super::merge::merge_preserving_live;
use super::objects::{
    DesiredObjectSet, OWNER_LABEL, OwnerRecord, owner_scope, owner_selector, to_api_objects,
};
use super::registry::{RECONCILED_KINDS, is_reconciled};
use super::report::{ReconcileError, ReconcileFailure, ReconcileOp, ReconcileReport};

type LiveObjects = BTreeMap<ObjectKind, BTreeMap<String, ApiObject>>;

/// Synchronizes the store with the objects `result` calls for.
///
/// * `owner` is `None` when the owner is gone; `result` is `None` when it
///   has not been evaluated. Either way nothing is desired and everything
///   the owner still has in the store is deleted.
/// * When `result` carries an evaluation error its manifest list is
///   incomplete: creates and updates still apply, deletes are skipped.
///
/// Objects live in the owner's own scope (see [`owner_scope`]) and carry its
/// label. Objects of other owners are never written or deleted.
///
/// Store failures do not abort the pass. Each one is recorded in the report
/// and the remaining operations still run; use
/// [`ReconcileReport::into_result`] to treat them as an error.
///
/// Callers must not run two passes for the same owner concurrently.
#[tracing::instrument(skip_all, fields(owner = %owner_nn, mode = %mode))]
pub async fn update_owned_objects(
    store: &dyn ObjectStore,
    owner_nn: &NamespacedName,
    owner: Option<&OwnerRecord>,
    result: Option<&LoadResult>,
    mode: EngineMode,
) -> Result<ReconcileReport, ReconcileError> {
    owner_nn.validate().map_err(ReconcileError::InvalidOwner)?;
    let mut report = ReconcileReport::new(owner_nn.clone());

    let desired = match (owner, result) {
        (Some(record), Some(result)) => {
            result.validate()?;
            let disable_sources = to_disable_sources(result);
            to_api_objects(owner_nn, record, result, mode, &disable_sources)
        }
        _ => DesiredObjectSet::new(),
    };

    for kind in desired.kinds().filter(|k| !is_reconciled(*k)) {
        tracing::error!(kind = %kind, "desired objects of an unregistered kind are ignored");
    }

    report.deletions_suppressed =
        owner.is_some() && result.is_some_and(LoadResult::has_error);
    if report.deletions_suppressed {
        tracing::warn!("load result has an error; stale objects are kept until it is fixed");
    }

    let live = list_owned(store, owner_nn, &mut report).await;
    let plan = Plan::compute(&desired, &live, report.deletions_suppressed);

    tracing::debug!(
        desired = desired.len(),
        to_create = plan.create.len(),
        to_update = plan.update.len(),
        to_delete = plan.delete.len(),
        "reconcile plan computed"
    );

    apply_creates(store, &plan.create, &owner_scope(owner_nn), &mut report).await;
    apply_updates(store, &plan.update, &mut report).await;
    apply_deletes(store, &plan.delete, &mut report).await;

    tracing::info!(
        created = report.created.len(),
        updated = report.updated.len(),
        deleted = report.deleted.len(),
        unchanged = report.unchanged.len(),
        failed = report.failures.len(),
        deletions_suppressed = report.deletions_suppressed,
        "owned objects reconciled"
    );

    Ok(report)
}

/// Lists the owner's live objects of every registered kind. A kind whose
/// listing fails is left out, so it is neither written nor collected.
async fn list_owned(
    store: &dyn ObjectStore,
    owner: &NamespacedName,
    report: &mut ReconcileReport,
) -> LiveObjects {
    let scope = owner_scope(owner);
    let params = ListParams::new(owner_selector(owner)).in_namespace(scope.clone());
    let mut live = LiveObjects::new();

    for &kind in RECONCILED_KINDS {
        match store.list(kind, &params).await {
            Ok(objects) => {
                let by_name = objects
                    .into_iter()
                    .map(|o| (o.name().to_string(), o))
                    .collect();
                live.insert(kind, by_name);
            }
            Err(error) => {
                tracing::warn!(kind = %kind, error = %error, "listing failed; kind skipped");
                let key = NamespacedName::new(scope.clone(), "");
                let object = ObjectRef::new(kind, &key);
                report
                    .failures
                    .push(ReconcileFailure::new(object, ReconcileOp::List, error));
            }
        }
    }
    live
}

struct Plan<'a> {
    create: Vec<&'a ApiObject>,
    update: Vec<(&'a ApiObject, &'a ApiObject)>,
    delete: Vec<ObjectRef>,
}

impl<'a> Plan<'a> {
    fn compute(desired: &'a DesiredObjectSet, live: &'a LiveObjects, keep_stale: bool) -> Self {
        let mut plan = Plan {
            create: Vec::new(),
            update: Vec::new(),
            delete: Vec::new(),
        };

        for (kind, live_objects) in live {
            let wanted = desired.of_kind(*kind);

            for (name, object) in wanted.into_iter().flatten() {
                match live_objects.get(name) {
                    Some(current) => plan.update.push((object, current)),
                    None => plan.create.push(object),
                }
            }

            if keep_stale {
                continue;
            }
            plan.delete.extend(
                live_objects
                    .iter()
                    .filter(|(name, _)| !wanted.is_some_and(|w| w.contains_key(*name)))
                    .map(|(_, object)| object.object_ref()),
            );
        }
        plan
    }
}

async fn apply_creates(
    store: &dyn ObjectStore,
    objects: &[&ApiObject],
    owner_label: &str,
    report: &mut ReconcileReport,
) {
    for object in objects {
        let object_ref = object.object_ref();
        match store.create(object).await {
            Ok(_) => {
                tracing::debug!(object = %object_ref, "created");
                report.created.push(object_ref);
            }
            Err(error) if error.is_already_exists() && object_ref.kind.preserves_payload() => {
                // Unlabeled objects are adopted; another owner's are left alone.
                match store.get(object_ref.kind, &object_ref.key()).await {
                    Ok(existing) if !held_by_other_owner(&existing, owner_label) => {
                        tracing::debug!(object = %object_ref, "already present; payload left as is");
                        report.unchanged.push(object_ref);
                    }
                    Ok(_) => {
                        tracing::warn!(object = %object_ref, "held by another owner");
                        report
                            .failures
                            .push(ReconcileFailure::new(object_ref, ReconcileOp::Create, error));
                    }
                    Err(get_error) => {
                        tracing::warn!(object = %object_ref, error = %get_error, "create failed");
                        report.failures.push(ReconcileFailure::new(
                            object_ref,
                            ReconcileOp::Create,
                            get_error,
                        ));
                    }
                }
            }
            Err(error) => {
                tracing::warn!(object = %object_ref, error = %error, "create failed");
                report
                    .failures
                    .push(ReconcileFailure::new(object_ref, ReconcileOp::Create, error));
            }
        }
    }
}

async fn apply_updates(
    store: &dyn ObjectStore,
    pairs: &[(&ApiObject, &ApiObject)],
    report: &mut ReconcileReport,
) {
    for (desired, current) in pairs {
        let object_ref = desired.object_ref();

        let spec = if object_ref.kind.preserves_payload() {
            match merge_preserving_live(&desired.spec, &current.spec) {
                Ok(spec) => spec,
                Err(error) => {
                    tracing::warn!(object = %object_ref, error = %error, "merge failed");
                    report
                        .failures
                        .push(ReconcileFailure::new(object_ref, ReconcileOp::Update, error));
                    continue;
                }
            }
        } else {
            desired.spec.clone()
        };

        if !needs_update(desired, current, &spec) {
            report.unchanged.push(object_ref);
            continue;
        }

        let mut next = (*current).clone();
        next.spec = spec;
        next.metadata.labels = desired.metadata.labels.clone();
        next.metadata.annotations = desired.metadata.annotations.clone();

        let expected = current.resource_version().unwrap_or_default();
        match store.update(&next, expected).await {
            Ok(_) => {
                tracing::debug!(object = %object_ref, "updated");
                report.updated.push(object_ref);
            }
            Err(error) => {
                tracing::warn!(object = %object_ref, error = %error, "update failed");
                report
                    .failures
                    .push(ReconcileFailure::new(object_ref, ReconcileOp::Update, error));
            }
        }
    }
}

async fn apply_deletes(
    store: &dyn ObjectStore,
    objects: &[ObjectRef],
    report: &mut ReconcileReport,
) {
    for object_ref in objects {
        match store.delete(object_ref.kind, &object_ref.key()).await {
            Ok(()) => {
                tracing::debug!(object = %object_ref, "deleted");
                report.deleted.push(object_ref.clone());
            }
            Err(error) if error.is_not_found() => {
                tracing::debug!(object = %object_ref, "already gone");
                report.deleted.push(object_ref.clone());
            }
            Err(error) => {
                tracing::warn!(object = %object_ref, error = %error, "delete failed");
                report.failures.push(ReconcileFailure::new(
                    object_ref.clone(),
                    ReconcileOp::Delete,
                    error,
                ));
            }
        }
    }
}

fn held_by_other_owner(object: &ApiObject, owner_label: &str) -> bool {
    object
        .metadata
        .labels
        .get(OWNER_LABEL)
        .is_some_and(|holder| holder != owner_label)
}

/// Whether writing `spec` and the desired metadata would change `current`.
fn needs_update(desired: &ApiObject, current: &ApiObject, spec: &ObjectSpec) -> bool {
    current.spec != *spec
        || current.metadata.labels != desired.metadata.labels
        || current.metadata.annotations != desired.metadata.annotations
}
