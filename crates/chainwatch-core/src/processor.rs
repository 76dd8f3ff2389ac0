//! Block processor: drains the hash queue, fetches each block and records the
//! transactions that touch a registered address.
//!
//! Delivery is at-most-once. A block whose fetch fails is dropped, and the
//! first per-transaction failure abandons the rest of its block. Neither is
//! retried and neither stops the processor.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chain::{BlockFetcher, SenderRecovery};
use crate::error::WatchError;
use crate::queue::HashReceiver;
use crate::stats::PipelineStats;
use crate::store::{SubscriberRegistry, TransactionStore};
use crate::types::{Address, Block};

/// Sequential consumer of the hash queue.
pub struct BlockProcessor {
    fetcher: Arc<dyn BlockFetcher>,
    recovery: Arc<dyn SenderRecovery>,
    registry: Arc<dyn SubscriberRegistry>,
    store: Arc<dyn TransactionStore>,
    stats: Arc<PipelineStats>,
}

impl BlockProcessor {
    pub fn new(
        fetcher: Arc<dyn BlockFetcher>,
        recovery: Arc<dyn SenderRecovery>,
        registry: Arc<dyn SubscriberRegistry>,
        store: Arc<dyn TransactionStore>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            fetcher,
            recovery,
            registry,
            store,
            stats,
        }
    }

    /// Process hashes in FIFO order until every sender is dropped and the
    /// queue is drained, or until `cancel` fires. Both end with `Ok(())`.
    pub async fn run(&self, mut receiver: HashReceiver, cancel: CancellationToken) -> Result<(), WatchError> {
        loop {
            let hash = match receiver.pop(&cancel).await {
                Ok(Some(hash)) => hash,
                Ok(None) => {
                    info!("hash queue drained, block processor stopping");
                    return Ok(());
                }
                Err(WatchError::Cancelled) => return Ok(()),
                Err(e) => return Err(e),
            };

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                res = self.fetcher.block_by_hash(&hash) => res,
            };
            let block = match fetched {
                Ok(block) => block,
                Err(e) => {
                    warn!(hash = %hash, error = %e, "failed to fetch block, skipping");
                    self.stats.block_failed();
                    continue;
                }
            };

            let number = block.number;
            match self.process_block(block).await {
                Ok(matched) => {
                    self.stats.block_processed();
                    debug!(hash = %hash, number, matched, "block processed");
                }
                Err(e) => {
                    warn!(hash = %hash, number, error = %e, "block processing aborted");
                    self.stats.block_failed();
                }
            }
        }
    }

    /// Match and store every relevant transaction of `block`, in block order.
    ///
    /// Stops at the first failing transaction; anything saved before it stays
    /// saved. Returns the number of stored transactions.
    pub async fn process_block(&self, block: Block) -> Result<usize, WatchError> {
        let Block {
            hash,
            number,
            transactions,
        } = block;

        let mut matched = 0;
        for tx in transactions {
            let from = self.recovery.recover_sender(&tx)?;
            let Some(owner) = self.match_address(&from, tx.to.as_ref()).await? else {
                continue;
            };
            let record = tx.into_record(from, &hash, number);
            self.store.save_tx(&owner, &record).await?;
            self.stats.tx_matched();
            debug!(tx = %record.hash, address = %owner, "transaction matched");
            matched += 1;
        }
        Ok(matched)
    }

    /// The address a transaction is recorded under: the sender if it is
    /// subscribed, otherwise the recipient if that one is.
    async fn match_address(&self, from: &Address, to: Option<&Address>) -> Result<Option<Address>, WatchError> {
        if self.registry.is_subscriber(from).await? {
            return Ok(Some(from.clone()));
        }
        match to {
            Some(to) if self.registry.is_subscriber(to).await? => Ok(Some(to.clone())),
            _ => Ok(None),
        }
    }
}
