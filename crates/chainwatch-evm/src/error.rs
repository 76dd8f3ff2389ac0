//! Transport-level error types.

use chainwatch_core::WatchError;
use thiserror::Error;

use crate::request::JsonRpcError;

/// Errors raised while talking to a JSON-RPC node.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, non-2xx status, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON-RPC protocol-level error returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// Request timed out after the configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Returns `true` if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Timeout { .. })
    }
}

impl From<TransportError> for WatchError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Deserialization(e) => WatchError::Decode(e.to_string()),
            TransportError::Other(msg) => WatchError::Other(msg),
            other => WatchError::Rpc(other.to_string()),
        }
    }
}
