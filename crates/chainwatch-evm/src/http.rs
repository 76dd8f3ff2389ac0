//! HTTP JSON-RPC client backed by `reqwest`, used for point queries.
//!
//! Block fetches are at-most-once by default: `HttpClientConfig::default()`
//! carries `RetryConfig::none()`, so a failed `eth_getBlockByHash` surfaces
//! immediately and that block is dropped. Callers that want retries opt in
//! through `HttpClientConfig::retry`; then transient transport failures
//! (connection errors, non-2xx statuses, timeouts) are retried with bounded
//! exponential backoff. Errors returned by the node itself never are.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chainwatch_core::{Block, BlockFetcher, BlockHash, WatchError};
use serde_json::Value;

use crate::block::parse_block;
use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};
use crate::retry::{RetryConfig, RetryPolicy};

/// Configuration for `HttpRpcClient`.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Disabled by default.
    pub retry: RetryConfig,
    pub request_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::none(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP JSON-RPC client.
pub struct HttpRpcClient {
    url: String,
    http: reqwest::Client,
    retry: RetryPolicy,
    request_timeout: Duration,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    /// Create a client for the given JSON-RPC endpoint URL.
    pub fn new(url: impl Into<String>, config: HttpClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            http,
            retry: RetryPolicy::new(config.retry),
            request_timeout: config.request_timeout,
            next_id: AtomicU64::new(1),
        })
    }

    /// Call `method` and return its `result`, retrying transient failures when
    /// a retry budget is configured.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        let req = JsonRpcRequest::new(self.next_id.fetch_add(1, Ordering::Relaxed), method, params);

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.send_once(&req).await {
                Ok(resp) => return resp.into_result().map_err(TransportError::Rpc),
                Err(e) if e.is_retryable() => match self.retry.next_delay(attempt) {
                    Some(delay) => {
                        tracing::warn!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            method,
                            "retrying request"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        tracing::error!(attempt, error = %e, method, "max retries exceeded");
                        return Err(e);
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let resp = self
            .http
            .post(&self.url)
            .json(req)
            .send()
            .await
            .map_err(|e| self.map_reqwest(e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Http(format!("HTTP {status}: {body}")));
        }

        let bytes = resp.bytes().await.map_err(|e| self.map_reqwest(e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn map_reqwest(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                ms: self.request_timeout.as_millis() as u64,
            }
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl BlockFetcher for HttpRpcClient {
    async fn block_by_hash(&self, hash: &BlockHash) -> Result<Block, WatchError> {
        let result = self
            .call("eth_getBlockByHash", vec![Value::String(hash.0.clone()), Value::Bool(true)])
            .await?;
        if result.is_null() {
            return Err(WatchError::BlockNotFound { hash: hash.0.clone() });
        }
        parse_block(&result)
    }
}
