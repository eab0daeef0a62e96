//! Per-owner mutual exclusion for reconciliation passes.

use std::sync::Arc;

use dashmap::DashMap;
use keel_core::NamespacedName;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serializes passes for the same owner while letting different owners run
/// concurrently.
///
/// An owner's entry is kept for the lifetime of the map, even after the owner
/// is removed, so every pass for it contends on the same mutex.
#[derive(Debug, Clone, Default)]
pub struct OwnerLocks {
    locks: Arc<DashMap<NamespacedName, Arc<Mutex<()>>>>,
}

impl OwnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `owner`. Access lasts until the guard
    /// is dropped.
    pub async fn lock(&self, owner: &NamespacedName) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the map shard is not held across the await.
        let mutex = self.locks.entry(owner.clone()).or_default().clone();
        mutex.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_owner_is_serialized() {
        let locks = OwnerLocks::new();
        let owner = NamespacedName::named("tf");

        let guard = locks.lock(&owner).await;
        let contended = tokio::time::timeout(Duration::from_millis(50), locks.lock(&owner)).await;
        assert!(contended.is_err());

        drop(guard);
        let reacquired = tokio::time::timeout(Duration::from_millis(50), locks.lock(&owner)).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn test_different_owners_do_not_block() {
        let locks = OwnerLocks::new();
        let _a = locks.lock(&NamespacedName::named("a")).await;
        let b = tokio::time::timeout(
            Duration::from_millis(50),
            locks.lock(&NamespacedName::named("b")),
        )
        .await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let locks = OwnerLocks::new();
        let other = locks.clone();
        let owner = NamespacedName::named("tf");

        let _guard = locks.lock(&owner).await;
        let contended = tokio::time::timeout(Duration::from_millis(50), other.lock(&owner)).await;
        assert!(contended.is_err());
        assert_eq!(other.len(), 1);
    }
}
