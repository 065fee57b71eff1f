//! SQLite-backed Block Store.
//!
//! This crate implements the `sbx-core` BlockStore port over sqlx/SQLite.
//! The schema is a single bare-id table: membership is the whole record.
//! SQLite's single-writer model serializes same-id block/unblock pairs, and
//! both mutations are single idempotent statements, so there is no
//! half-applied state to recover from.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

use sbx_core::{blocklist::BlockStore, domain::UserId, Error, Result};

pub struct SqliteBlockStore {
    pool: SqlitePool,
}

impl SqliteBlockStore {
    /// Open (creating if needed) the database at `path`.
    pub async fn open(path: &str) -> Result<Self> {
        let url = format!("sqlite:{path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(store_err)?;

        let store = Self { pool };
        store.initialize().await?;
        info!(path, "block store ready");
        Ok(store)
    }

    /// In-memory store for tests.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(store_err)?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS blocked_senders (
                sender_id INTEGER PRIMARY KEY
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }
}

#[async_trait]
impl BlockStore for SqliteBlockStore {
    async fn is_blocked(&self, id: UserId) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM blocked_senders WHERE sender_id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(row.is_some())
    }

    async fn block(&self, id: UserId) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO blocked_senders (sender_id) VALUES (?)")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn unblock(&self, id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM blocked_senders WHERE sender_id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected() > 0)
    }
}

fn store_err(e: sqlx::Error) -> Error {
    Error::Store(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn block_then_unblock_round_trip() {
        let store = SqliteBlockStore::in_memory().await.unwrap();
        let id = UserId(111);

        assert!(!store.is_blocked(id).await.unwrap());
        store.block(id).await.unwrap();
        assert!(store.is_blocked(id).await.unwrap());
        assert!(store.unblock(id).await.unwrap());
        assert!(!store.is_blocked(id).await.unwrap());
    }

    #[tokio::test]
    async fn double_block_is_one_logical_entry() {
        let store = SqliteBlockStore::in_memory().await.unwrap();
        let id = UserId(7);

        store.block(id).await.unwrap();
        store.block(id).await.unwrap();

        assert!(store.unblock(id).await.unwrap());
        assert!(!store.is_blocked(id).await.unwrap());
        assert!(!store.unblock(id).await.unwrap());
    }

    #[tokio::test]
    async fn unblock_of_unknown_id_returns_false() {
        let store = SqliteBlockStore::in_memory().await.unwrap();
        assert!(!store.unblock(UserId(42)).await.unwrap());
    }

    #[tokio::test]
    async fn ids_are_independent() {
        let store = SqliteBlockStore::in_memory().await.unwrap();
        store.block(UserId(1)).await.unwrap();
        store.block(UserId(2)).await.unwrap();

        assert!(store.unblock(UserId(1)).await.unwrap());
        assert!(store.is_blocked(UserId(2)).await.unwrap());
    }
}
