use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{domain::UserId, Result};

/// Persistence port for the blocked-sender set.
///
/// Membership is boolean: present means blocked. `block` is idempotent,
/// `unblock` reports whether a removal actually happened. Implementations
/// must serialize writes per id so a racing block/unblock pair resolves to
/// a single well-defined final state.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Total function: unknown ids are simply not blocked.
    async fn is_blocked(&self, id: UserId) -> Result<bool>;

    /// Insert `id` if absent. Blocking an already-blocked id is a no-op.
    async fn block(&self, id: UserId) -> Result<()>;

    /// Remove `id` if present; returns whether a removal occurred.
    async fn unblock(&self, id: UserId) -> Result<bool>;
}

/// In-memory implementation backing core tests.
#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    inner: Mutex<HashSet<i64>>,
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn is_blocked(&self, id: UserId) -> Result<bool> {
        Ok(self.inner.lock().await.contains(&id.0))
    }

    async fn block(&self, id: UserId) -> Result<()> {
        self.inner.lock().await.insert(id.0);
        Ok(())
    }

    async fn unblock(&self, id: UserId) -> Result<bool> {
        Ok(self.inner.lock().await.remove(&id.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn block_then_unblock_round_trip() {
        let store = MemoryBlockStore::default();
        let id = UserId(111);

        assert!(!store.is_blocked(id).await.unwrap());
        store.block(id).await.unwrap();
        assert!(store.is_blocked(id).await.unwrap());
        assert!(store.unblock(id).await.unwrap());
        assert!(!store.is_blocked(id).await.unwrap());
    }

    #[tokio::test]
    async fn block_is_idempotent() {
        let store = MemoryBlockStore::default();
        let id = UserId(5);

        store.block(id).await.unwrap();
        store.block(id).await.unwrap();
        assert!(store.is_blocked(id).await.unwrap());

        // A single unblock clears the single logical entry.
        assert!(store.unblock(id).await.unwrap());
        assert!(!store.is_blocked(id).await.unwrap());
    }

    #[tokio::test]
    async fn unblock_of_unknown_id_reports_not_found() {
        let store = MemoryBlockStore::default();
        assert!(!store.unblock(UserId(42)).await.unwrap());
        assert!(!store.is_blocked(UserId(42)).await.unwrap());
    }
}
