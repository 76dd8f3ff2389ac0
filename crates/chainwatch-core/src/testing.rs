//! In-crate doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::chain::{BlockFetcher, SenderRecovery};
use crate::error::WatchError;
use crate::store::{SubscriberRegistry, TransactionStore};
use crate::types::{Address, Block, BlockHash, SignedTransaction, Transaction};

pub fn signed_tx(hash: &str, to: Option<&str>) -> SignedTransaction {
    SignedTransaction {
        hash: hash.to_string(),
        tx_type: 2,
        chain_id: Some(1),
        nonce: 0,
        to: to.map(Address::normalized),
        value: "0x0".into(),
        input: "0x".into(),
        gas: 21_000,
        transaction_index: 0,
        raw: serde_json::Value::Null,
    }
}

/// Serves blocks from a map. Unknown hashes are `BlockNotFound`; with
/// `stall` set every fetch hangs forever.
#[derive(Default)]
pub struct MapFetcher {
    pub blocks: HashMap<String, Block>,
    pub stall: bool,
}

impl MapFetcher {
    pub fn insert(&mut self, block: Block) {
        self.blocks.insert(block.hash.0.clone(), block);
    }
}

#[async_trait]
impl BlockFetcher for MapFetcher {
    async fn block_by_hash(&self, hash: &BlockHash) -> Result<Block, WatchError> {
        if self.stall {
            futures::future::pending::<()>().await;
        }
        self.blocks
            .get(hash.as_str())
            .cloned()
            .ok_or_else(|| WatchError::BlockNotFound { hash: hash.0.clone() })
    }
}

/// Maps transaction hashes to senders; unknown hashes fail recovery.
#[derive(Default)]
pub struct MapRecovery {
    senders: Mutex<HashMap<String, String>>,
}

impl MapRecovery {
    pub fn set(&self, tx_hash: &str, sender: &str) {
        self.senders.lock().unwrap().insert(tx_hash.into(), sender.into());
    }
}

impl SenderRecovery for MapRecovery {
    fn recover_sender(&self, tx: &SignedTransaction) -> Result<Address, WatchError> {
        self.senders
            .lock()
            .unwrap()
            .get(&tx.hash)
            .map(|s| Address::normalized(s))
            .ok_or_else(|| WatchError::SenderRecovery {
                tx_hash: tx.hash.clone(),
                reason: "invalid signature".into(),
            })
    }
}

#[derive(Default)]
pub struct MemRegistry {
    set: Mutex<HashSet<Address>>,
}

impl MemRegistry {
    pub fn add(&self, address: &str) {
        self.set.lock().unwrap().insert(Address::normalized(address));
    }
}

#[async_trait]
impl SubscriberRegistry for MemRegistry {
    async fn create(&self, address: &Address) -> Result<bool, WatchError> {
        Ok(self.set.lock().unwrap().insert(address.clone()))
    }

    async fn is_subscriber(&self, address: &Address) -> Result<bool, WatchError> {
        Ok(self.set.lock().unwrap().contains(address))
    }
}

#[derive(Default)]
pub struct MemStore {
    txs: Mutex<HashMap<Address, Vec<Transaction>>>,
}

impl MemStore {
    pub fn txs(&self, address: &str) -> Vec<Transaction> {
        self.txs
            .lock()
            .unwrap()
            .get(&Address::normalized(address))
            .cloned()
            .unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.txs.lock().unwrap().values().map(Vec::len).sum()
    }
}

#[async_trait]
impl TransactionStore for MemStore {
    async fn save_tx(&self, address: &Address, tx: &Transaction) -> Result<(), WatchError> {
        self.txs
            .lock()
            .unwrap()
            .entry(address.clone())
            .or_default()
            .push(tx.clone());
        Ok(())
    }

    async fn get_txs(&self, address: &Address) -> Result<Vec<Transaction>, WatchError> {
        Ok(self.txs.lock().unwrap().get(address).cloned().unwrap_or_default())
    }
}
