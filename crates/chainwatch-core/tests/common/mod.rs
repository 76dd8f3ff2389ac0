//! Test doubles for driving the full pipeline.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chainwatch_core::{
    Address, Block, BlockFetcher, BlockHash, BlockHeader, HeaderSource, HeaderStream, SenderRecovery,
    SignedTransaction, SubscriberRegistry, Transaction, TransactionStore, WatchError,
};
use futures::channel::mpsc;
use futures::StreamExt;
use tokio::sync::Semaphore;

// ─── Header source ───────────────────────────────────────────────────────────

/// Header source fed by the test through [`HeaderFeed`].
pub struct ChannelSource {
    rx: Mutex<Option<mpsc::UnboundedReceiver<Result<BlockHeader, WatchError>>>>,
}

pub struct HeaderFeed(mpsc::UnboundedSender<Result<BlockHeader, WatchError>>);

impl HeaderFeed {
    pub fn announce(&self, height: u64, hash: &str) {
        self.0.unbounded_send(Ok(BlockHeader::new(height, hash))).unwrap();
    }
}

pub fn channel_source() -> (Arc<ChannelSource>, HeaderFeed) {
    let (tx, rx) = mpsc::unbounded();
    (
        Arc::new(ChannelSource {
            rx: Mutex::new(Some(rx)),
        }),
        HeaderFeed(tx),
    )
}

#[async_trait]
impl HeaderSource for ChannelSource {
    async fn subscribe_new_headers(&self) -> Result<HeaderStream, WatchError> {
        match self.rx.lock().unwrap().take() {
            Some(rx) => Ok(rx.boxed()),
            None => Err(WatchError::Subscription("already subscribed".into())),
        }
    }
}

// ─── Block fetcher ───────────────────────────────────────────────────────────

/// Serves blocks registered by the test. When gated, each fetch waits for a
/// permit from [`GatedFetcher::release`].
pub struct GatedFetcher {
    blocks: Mutex<HashMap<String, Block>>,
    gate: Option<Semaphore>,
    fetched: Mutex<Vec<String>>,
}

impl GatedFetcher {
    pub fn open() -> Arc<Self> {
        Arc::new(Self {
            blocks: Mutex::new(HashMap::new()),
            gate: None,
            fetched: Mutex::new(vec![]),
        })
    }

    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            blocks: Mutex::new(HashMap::new()),
            gate: Some(Semaphore::new(0)),
            fetched: Mutex::new(vec![]),
        })
    }

    pub fn insert(&self, block: Block) {
        self.blocks.lock().unwrap().insert(block.hash.0.clone(), block);
    }

    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlockFetcher for GatedFetcher {
    async fn block_by_hash(&self, hash: &BlockHash) -> Result<Block, WatchError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.fetched.lock().unwrap().push(hash.0.clone());
        self.blocks
            .lock()
            .unwrap()
            .get(hash.as_str())
            .cloned()
            .ok_or_else(|| WatchError::BlockNotFound { hash: hash.0.clone() })
    }
}

// ─── Sender recovery ─────────────────────────────────────────────────────────

/// Reads the sender from `raw.from`, as a node would report it, and
/// normalizes it. A missing field is a recovery failure.
pub struct RawFromRecovery;

impl SenderRecovery for RawFromRecovery {
    fn recover_sender(&self, tx: &SignedTransaction) -> Result<Address, WatchError> {
        tx.raw
            .get("from")
            .and_then(|v| v.as_str())
            .map(Address::normalized)
            .ok_or_else(|| WatchError::SenderRecovery {
                tx_hash: tx.hash.clone(),
                reason: "no signature".into(),
            })
    }
}

// ─── Storage ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct Registry(Mutex<HashSet<Address>>);

#[async_trait]
impl SubscriberRegistry for Registry {
    async fn create(&self, address: &Address) -> Result<bool, WatchError> {
        Ok(self.0.lock().unwrap().insert(address.clone()))
    }

    async fn is_subscriber(&self, address: &Address) -> Result<bool, WatchError> {
        Ok(self.0.lock().unwrap().contains(address))
    }
}

#[derive(Default)]
pub struct Store(Mutex<HashMap<Address, Vec<Transaction>>>);

#[async_trait]
impl TransactionStore for Store {
    async fn save_tx(&self, address: &Address, tx: &Transaction) -> Result<(), WatchError> {
        self.0.lock().unwrap().entry(address.clone()).or_default().push(tx.clone());
        Ok(())
    }

    async fn get_txs(&self, address: &Address) -> Result<Vec<Transaction>, WatchError> {
        Ok(self.0.lock().unwrap().get(address).cloned().unwrap_or_default())
    }
}

// ─── Builders ────────────────────────────────────────────────────────────────

/// A transaction whose sender is `from` (any case) sent to `to`.
pub fn tx(hash: &str, from: &str, to: Option<&str>) -> SignedTransaction {
    SignedTransaction {
        hash: hash.to_string(),
        tx_type: 0,
        chain_id: Some(1),
        nonce: 0,
        to: to.map(Address::normalized),
        value: "0x1".into(),
        input: "0x".into(),
        gas: 21_000,
        transaction_index: 0,
        raw: serde_json::json!({ "from": from }),
    }
}

pub fn block(hash: &str, number: u64, transactions: Vec<SignedTransaction>) -> Block {
    Block {
        hash: BlockHash::new(hash),
        number,
        transactions,
    }
}

/// Poll `cond` until it holds or two seconds pass.
pub async fn eventually<F: Fn() -> bool>(cond: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(tokio::time::Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
