//! Storage ports for the subscriber registry and the matched-transaction
//! history.
//!
//! Implementations include `InMemoryRegistry` / `InMemoryTxStore` and
//! `SqliteStorage` in `chainwatch-storage`. Each implementation owns its own
//! synchronization; callers share them behind `Arc<dyn …>`.

use async_trait::async_trait;

use crate::error::WatchError;
use crate::types::{Address, Transaction};

/// The set of addresses whose transactions are recorded.
#[async_trait]
pub trait SubscriberRegistry: Send + Sync {
    /// Insert `address` if absent.
    ///
    /// Returns `true` if it was newly inserted, `false` if it was already
    /// present. The check and the insert are a single atomic operation.
    async fn create(&self, address: &Address) -> Result<bool, WatchError>;

    /// Returns `true` if `address` is registered.
    async fn is_subscriber(&self, address: &Address) -> Result<bool, WatchError>;
}

/// Per-address, append-only transaction history.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Append `tx` to the history of `address`.
    async fn save_tx(&self, address: &Address, tx: &Transaction) -> Result<(), WatchError>;

    /// The history of `address` in discovery order. Empty when unknown.
    async fn get_txs(&self, address: &Address) -> Result<Vec<Transaction>, WatchError>;
}
