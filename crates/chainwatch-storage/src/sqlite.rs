//! SQLite storage backend for ChainWatch.
//!
//! Persists subscribers and matched transactions to a single SQLite file so
//! that subscriptions and history survive a restart.
//!
//! # Usage
//! ```rust,no_run
//! use chainwatch_storage::sqlite::SqliteStorage;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-backed (persistent)
//! let store = SqliteStorage::open("./watch.db").await?;
//!
//! // In-memory (tests / ephemeral)
//! let store = SqliteStorage::in_memory().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use chainwatch_core::{Address, SubscriberRegistry, Transaction, TransactionStore, WatchError};

fn storage_err(e: impl std::fmt::Display) -> WatchError {
    WatchError::Storage(e.to_string())
}

/// SQLite-backed subscriber registry and transaction store.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The path may be a plain file path (`"./watch.db"`) or a full
    /// SQLite URL (`"sqlite:./watch.db?mode=rwc"`).
    pub async fn open(path: &str) -> Result<Self, WatchError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let pool = SqlitePool::connect(&url).await.map_err(storage_err)?;
        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Every connection to `sqlite::memory:` sees its own database, so the
    /// pool is pinned to a single connection.
    pub async fn in_memory() -> Result<Self, WatchError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(storage_err)?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<(), WatchError> {
        sqlx::query("PRAGMA journal_mode=WAL;")
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS subscribers (
                address    TEXT PRIMARY KEY NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS transactions (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                address      TEXT    NOT NULL,
                tx_hash      TEXT    NOT NULL,
                block_number INTEGER NOT NULL,
                tx_json      TEXT    NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_transactions_address ON transactions (address)")
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        debug!("sqlite schema ready");
        Ok(())
    }

    /// Number of stored transaction rows across all addresses.
    pub async fn tx_count(&self) -> Result<u64, WatchError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM transactions")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(row.get::<i64, _>("n") as u64)
    }
}

#[async_trait]
impl SubscriberRegistry for SqliteStorage {
    async fn create(&self, address: &Address) -> Result<bool, WatchError> {
        let result = sqlx::query("INSERT OR IGNORE INTO subscribers (address) VALUES (?)")
            .bind(address.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn is_subscriber(&self, address: &Address) -> Result<bool, WatchError> {
        let row = sqlx::query("SELECT 1 FROM subscribers WHERE address = ?")
            .bind(address.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl TransactionStore for SqliteStorage {
    async fn save_tx(&self, address: &Address, tx: &Transaction) -> Result<(), WatchError> {
        let json = serde_json::to_string(tx).map_err(storage_err)?;
        sqlx::query(
            "INSERT INTO transactions (address, tx_hash, block_number, tx_json)
             VALUES (?, ?, ?, ?)",
        )
        .bind(address.as_str())
        .bind(&tx.hash)
        .bind(tx.block_number as i64)
        .bind(json)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        debug!(address = %address, tx = %tx.hash, "transaction persisted");
        Ok(())
    }

    async fn get_txs(&self, address: &Address) -> Result<Vec<Transaction>, WatchError> {
        let rows = sqlx::query("SELECT tx_json FROM transactions WHERE address = ? ORDER BY id ASC")
            .bind(address.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;

        rows.iter()
            .map(|row| {
                let json: String = row.get("tx_json");
                serde_json::from_str(&json).map_err(storage_err)
            })
            .collect()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
