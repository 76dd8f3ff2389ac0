//! Error types for the chainwatch pipeline.

use thiserror::Error;

/// Errors that can occur while watching the chain or serving queries.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Block {hash} not found")]
    BlockNotFound { hash: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Sender recovery failed for tx {tx_hash}: {reason}")]
    SenderRecovery { tx_hash: String, reason: String },

    #[error("Unsupported transaction type 0x{tx_type:02x} (tx {tx_hash})")]
    UnsupportedTxType { tx_hash: String, tx_type: u8 },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Block hash queue closed")]
    QueueClosed,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl WatchError {
    /// Returns `true` if this error is the result of cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
