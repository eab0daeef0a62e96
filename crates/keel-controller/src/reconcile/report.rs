//! Outcome of one reconciliation pass.

use std::fmt;

use keel_core::{CoreError, NamespacedName};
use keel_storage::{ObjectRef, StorageError};
use serde::{Serialize, Serializer};

/// Store operation a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileOp {
    List,
    Create,
    Update,
    Delete,
}

impl fmt::Display for ReconcileOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// One store operation that did not succeed.
///
/// For `List` failures the object name is empty: the whole kind was skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileFailure {
    pub object: ObjectRef,
    pub op: ReconcileOp,
    #[serde(serialize_with = "serialize_display")]
    pub error: StorageError,
}

impl ReconcileFailure {
    pub fn new(object: ObjectRef, op: ReconcileOp, error: StorageError) -> Self {
        Self { object, op, error }
    }
}

impl fmt::Display for ReconcileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.op, self.object, self.error)
    }
}

fn serialize_display<S: Serializer>(value: &impl fmt::Display, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}

/// What one pass did to the store for one owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub owner: NamespacedName,
    pub created: Vec<ObjectRef>,
    pub updated: Vec<ObjectRef>,
    pub deleted: Vec<ObjectRef>,
    /// Desired objects already matching the store.
    pub unchanged: Vec<ObjectRef>,
    pub failures: Vec<ReconcileFailure>,
    /// Set when the load result carried an error and stale objects were kept.
    pub deletions_suppressed: bool,
}

impl ReconcileReport {
    pub fn new(owner: NamespacedName) -> Self {
        Self {
            owner,
            created: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
            unchanged: Vec::new(),
            failures: Vec::new(),
            deletions_suppressed: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of writes that changed the store.
    pub fn change_count(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }

    /// Turns a pass with failures into [`ReconcileError::Partial`].
    pub fn into_result(self) -> Result<Self, ReconcileError> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(ReconcileError::Partial(Box::new(self)))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The load result is malformed; nothing was written.
    #[error("invalid load result: {0}")]
    InvalidLoadResult(#[from] CoreError),

    /// The owner's name cannot be scoped; nothing was written.
    #[error("invalid owner: {0}")]
    InvalidOwner(#[source] CoreError),

    #[error(
        "reconciliation of {} incomplete: {} operation(s) failed",
        .0.owner,
        .0.failures.len()
    )]
    Partial(Box<ReconcileReport>),
}

impl ReconcileError {
    /// The report of a partial pass, if that is what this error is.
    pub fn report(&self) -> Option<&ReconcileReport> {
        match self {
            Self::Partial(report) => Some(report),
            Self::InvalidLoadResult(_) | Self::InvalidOwner(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_storage::ObjectKind;

    fn object(name: &str) -> ObjectRef {
        ObjectRef::new(ObjectKind::KubernetesApply, &NamespacedName::named(name))
    }

    #[test]
    fn test_complete_report_is_ok() {
        let mut report = ReconcileReport::new(NamespacedName::named("tf"));
        report.created.push(object("fe"));
        report.deleted.push(object("be"));
        assert_eq!(report.change_count(), 2);
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_partial_report_is_error() {
        let mut report = ReconcileReport::new(NamespacedName::named("tf"));
        report.failures.push(ReconcileFailure::new(
            object("fe"),
            ReconcileOp::Create,
            StorageError::connection_error("refused"),
        ));

        let err = report.into_result().unwrap_err();
        assert_eq!(
            err.to_string(),
            "reconciliation of tf incomplete: 1 operation(s) failed"
        );
        assert_eq!(err.report().unwrap().failures.len(), 1);
    }

    #[test]
    fn test_report_json() {
        let mut report = ReconcileReport::new(NamespacedName::new("team", "tf"));
        report.failures.push(ReconcileFailure::new(
            object("fe"),
            ReconcileOp::Delete,
            StorageError::internal("boom"),
        ));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["owner"]["namespace"], "team");
        assert_eq!(json["failures"][0]["op"], "delete");
        assert_eq!(json["failures"][0]["error"], "Internal error: boom");
        assert_eq!(json["failures"][0]["object"]["kind"], "KubernetesApply");
    }
}
