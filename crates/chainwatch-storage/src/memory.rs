//! In-memory storage backend.
//!
//! Keeps the subscriber set and the matched-transaction history in RAM.
//! All data is lost when the process exits.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use chainwatch_core::{Address, SubscriberRegistry, Transaction, TransactionStore, WatchError};

/// In-memory subscriber registry.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    addresses: RwLock<HashSet<Address>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered addresses.
    pub fn len(&self) -> usize {
        self.addresses.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SubscriberRegistry for InMemoryRegistry {
    async fn create(&self, address: &Address) -> Result<bool, WatchError> {
        // Check-and-insert under a single write lock.
        let inserted = self
            .addresses
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(address.clone());
        Ok(inserted)
    }

    async fn is_subscriber(&self, address: &Address) -> Result<bool, WatchError> {
        Ok(self
            .addresses
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(address))
    }
}

/// In-memory per-address transaction history.
#[derive(Debug, Default)]
pub struct InMemoryTxStore {
    history: RwLock<HashMap<Address, Vec<Transaction>>>,
}

impl InMemoryTxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored records across all addresses.
    pub fn tx_count(&self) -> usize {
        self.history
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(Vec::len)
            .sum()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTxStore {
    async fn save_tx(&self, address: &Address, tx: &Transaction) -> Result<(), WatchError> {
        self.history
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(address.clone())
            .or_default()
            .push(tx.clone());
        debug!(address = %address, tx = %tx.hash, "transaction stored");
        Ok(())
    }

    async fn get_txs(&self, address: &Address) -> Result<Vec<Transaction>, WatchError> {
        Ok(self
            .history
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(address)
            .cloned()
            .unwrap_or_default())
    }
}
