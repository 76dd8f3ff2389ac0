//! Chain connection ports: block fetching, header subscription and sender
//! recovery.
//!
//! The pipeline only ever talks to the chain through these traits, so the
//! JSON-RPC implementations in `chainwatch-evm` and the test doubles are
//! interchangeable.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::WatchError;
use crate::types::{Address, Block, BlockHash, BlockHeader, SignedTransaction};

/// A stream of newly produced block headers.
///
/// An `Err` item is the subscription's error channel: after yielding one the
/// stream should be considered dead.
pub type HeaderStream = Pin<Box<dyn Stream<Item = Result<BlockHeader, WatchError>> + Send>>;

/// Fetches full blocks on demand.
#[async_trait]
pub trait BlockFetcher: Send + Sync {
    /// Fetch the block identified by `hash`, including full transaction
    /// objects in block order.
    async fn block_by_hash(&self, hash: &BlockHash) -> Result<Block, WatchError>;
}

/// Opens continuous new-header subscriptions.
#[async_trait]
pub trait HeaderSource: Send + Sync {
    async fn subscribe_new_headers(&self) -> Result<HeaderStream, WatchError>;
}

/// Recovers the originating address of a signed transaction.
///
/// Implementations derive the signing scheme from the transaction itself
/// (its type and chain id), never from block-level context.
pub trait SenderRecovery: Send + Sync {
    /// Returns the lowercase sender address.
    fn recover_sender(&self, tx: &SignedTransaction) -> Result<Address, WatchError>;
}
