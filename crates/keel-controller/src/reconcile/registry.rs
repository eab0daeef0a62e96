//! Kinds the reconciler lists and garbage-collects.

use keel_storage::ObjectKind;

/// Every kind the reconciler may touch. A kind missing here is never listed,
/// so stale objects of that kind would leak.
pub const RECONCILED_KINDS: &[ObjectKind] = &[
    ObjectKind::ConfigMap,
    ObjectKind::Cmd,
    ObjectKind::FileWatch,
    ObjectKind::KubernetesApply,
    ObjectKind::DockerComposeService,
    ObjectKind::ImageMap,
    ObjectKind::DockerImage,
    ObjectKind::CmdImage,
    ObjectKind::ToggleButton,
    ObjectKind::UiResource,
];

pub fn is_reconciled(kind: ObjectKind) -> bool {
    RECONCILED_KINDS.contains(&kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    // Adding a variant breaks this match, and the new arm has to link the
    // variant into the chain walked by `all_kinds`.
    fn next_kind(kind: ObjectKind) -> Option<ObjectKind> {
        match kind {
            ObjectKind::ConfigMap => Some(ObjectKind::Cmd),
            ObjectKind::Cmd => Some(ObjectKind::FileWatch),
            ObjectKind::FileWatch => Some(ObjectKind::KubernetesApply),
            ObjectKind::KubernetesApply => Some(ObjectKind::DockerComposeService),
            ObjectKind::DockerComposeService => Some(ObjectKind::ImageMap),
            ObjectKind::ImageMap => Some(ObjectKind::DockerImage),
            ObjectKind::DockerImage => Some(ObjectKind::CmdImage),
            ObjectKind::CmdImage => Some(ObjectKind::ToggleButton),
            ObjectKind::ToggleButton => Some(ObjectKind::UiResource),
            ObjectKind::UiResource => None,
        }
    }

    fn all_kinds() -> Vec<ObjectKind> {
        std::iter::successors(Some(ObjectKind::ConfigMap), |k| next_kind(*k)).collect()
    }

    #[test]
    fn test_every_kind_registered() {
        let all = all_kinds();
        for kind in &all {
            assert!(is_reconciled(*kind), "{kind} is not in RECONCILED_KINDS");
        }
        assert_eq!(all.len(), RECONCILED_KINDS.len());
    }

    #[test]
    fn test_no_duplicates() {
        let unique: HashSet<_> = RECONCILED_KINDS.iter().collect();
        assert_eq!(unique.len(), RECONCILED_KINDS.len());

        let walked: HashSet<_> = all_kinds().into_iter().collect();
        assert_eq!(walked.len(), all_kinds().len());
    }
}
