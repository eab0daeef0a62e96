//! Store, per-owner locking and configuration behind one handle.

use std::collections::BTreeMap;

use keel_core::{EngineMode, LoadResult, NamespacedName};
use keel_storage::DynObjectStore;

use crate::config::{KeelConfig, ReconcileSettings};
use crate::locks::OwnerLocks;
use crate::reconcile::{OwnerRecord, ReconcileError, ReconcileReport, update_owned_objects};

/// Runs reconciliation passes against one store.
///
/// Passes for the same owner are serialized; passes for different owners
/// may run concurrently from a shared `Reconciler`.
pub struct Reconciler {
    store: DynObjectStore,
    locks: OwnerLocks,
    settings: ReconcileSettings,
    feature_defaults: BTreeMap<String, bool>,
}

impl Reconciler {
    pub fn new(store: DynObjectStore, config: &KeelConfig) -> Self {
        Self {
            store,
            locks: OwnerLocks::new(),
            settings: config.reconcile.clone(),
            feature_defaults: config.features.clone(),
        }
    }

    pub fn store(&self) -> &DynObjectStore {
        &self.store
    }

    /// Qualifies an owner name, falling back to the configured namespace.
    pub fn owner_key(&self, name: &str, namespace: Option<&str>) -> NamespacedName {
        let namespace = namespace.unwrap_or(&self.settings.default_namespace);
        NamespacedName::new(namespace, name)
    }

    /// Reconciles `owner` against a freshly evaluated load result.
    ///
    /// Configured feature defaults fill in flags the result leaves unset.
    /// `mode` falls back to the configured default.
    pub async fn reconcile(
        &self,
        owner: &NamespacedName,
        record: &OwnerRecord,
        result: &LoadResult,
        mode: Option<EngineMode>,
    ) -> Result<ReconcileReport, ReconcileError> {
        let mut result = result.clone();
        result.merge_feature_defaults(&self.feature_defaults);
        let mode = mode.unwrap_or(self.settings.default_mode);

        let _guard = self.locks.lock(owner).await;
        let report =
            update_owned_objects(self.store.as_ref(), owner, Some(record), Some(&result), mode)
                .await?;
        self.finish(report)
    }

    /// Deletes everything `owner` still has in the store.
    pub async fn remove_owner(
        &self,
        owner: &NamespacedName,
    ) -> Result<ReconcileReport, ReconcileError> {
        let _guard = self.locks.lock(owner).await;
        let report = update_owned_objects(
            self.store.as_ref(),
            owner,
            None,
            None,
            self.settings.default_mode,
        )
        .await?;
        self.finish(report)
    }

    fn finish(&self, report: ReconcileReport) -> Result<ReconcileReport, ReconcileError> {
        if self.settings.fail_on_partial {
            report.into_result()
        } else {
            if !report.is_complete() {
                tracing::warn!(
                    owner = %report.owner,
                    failed = report.failures.len(),
                    "pass incomplete; the next pass retries"
                );
            }
            Ok(report)
        }
    }
}
