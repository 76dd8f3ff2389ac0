//! Pipeline counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time snapshot of [`PipelineStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub headers_received: u64,
    pub blocks_processed: u64,
    pub blocks_failed: u64,
    pub txs_matched: u64,
    pub resubscriptions: u64,
}

/// Lock-free counters updated by the listener and the processor.
#[derive(Debug, Default)]
pub struct PipelineStats {
    headers_received: AtomicU64,
    blocks_processed: AtomicU64,
    blocks_failed: AtomicU64,
    txs_matched: AtomicU64,
    resubscriptions: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header_received(&self) {
        self.headers_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn block_processed(&self) {
        self.blocks_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// A block whose fetch failed or whose processing was aborted.
    pub fn block_failed(&self) {
        self.blocks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tx_matched(&self) {
        self.txs_matched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn resubscribed(&self) {
        self.resubscriptions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            headers_received: self.headers_received.load(Ordering::Relaxed),
            blocks_processed: self.blocks_processed.load(Ordering::Relaxed),
            blocks_failed: self.blocks_failed.load(Ordering::Relaxed),
            txs_matched: self.txs_matched.load(Ordering::Relaxed),
            resubscriptions: self.resubscriptions.load(Ordering::Relaxed),
        }
    }
}
