//! Query facade over the running pipeline.

use std::sync::Arc;

use tracing::info;

use crate::error::WatchError;
use crate::height::ChainHeight;
use crate::stats::{PipelineStats, StatsSnapshot};
use crate::store::{SubscriberRegistry, TransactionStore};
use crate::types::{Address, Transaction};

/// Read/subscribe surface shared by every request handler.
///
/// Cheap to clone. Every method is safe to call concurrently with the
/// running pipeline; it reads the height counter and the two stores directly
/// and never touches the hash queue.
#[derive(Clone)]
pub struct WatchService {
    height: Arc<ChainHeight>,
    stats: Arc<PipelineStats>,
    registry: Arc<dyn SubscriberRegistry>,
    store: Arc<dyn TransactionStore>,
}

impl WatchService {
    pub fn new(
        height: Arc<ChainHeight>,
        stats: Arc<PipelineStats>,
        registry: Arc<dyn SubscriberRegistry>,
        store: Arc<dyn TransactionStore>,
    ) -> Self {
        Self {
            height,
            stats,
            registry,
            store,
        }
    }

    /// Height of the latest observed header, `0` before the first one.
    pub fn current_height(&self) -> u64 {
        self.height.get()
    }

    /// Register `address`. Returns `false` without effect if it was already
    /// registered (in any letter case).
    pub async fn subscribe(&self, address: &str) -> Result<bool, WatchError> {
        let address = Address::normalized(address);
        let created = self.registry.create(&address).await?;
        if created {
            info!(address = %address, "address subscribed");
        }
        Ok(created)
    }

    /// Every matched transaction recorded for `address`, in discovery order.
    pub async fn transactions_for(&self, address: &str) -> Result<Vec<Transaction>, WatchError> {
        self.store.get_txs(&Address::normalized(address)).await
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}
