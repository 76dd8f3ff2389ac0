//! Fluent builder wiring EVM chain connections into a `Pipeline`.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chainwatch_evm::WatcherBuilder;
//! # fn registry() -> Arc<dyn chainwatch_core::SubscriberRegistry> { unimplemented!() }
//! # fn store() -> Arc<dyn chainwatch_core::TransactionStore> { unimplemented!() }
//!
//! let pipeline = WatcherBuilder::new()
//!     .http_url("https://rpc.example.org")
//!     .ws_url("wss://rpc.example.org/ws")
//!     .queue_capacity(32)
//!     .registry(registry())
//!     .store(store())
//!     .build()
//!     .unwrap();
//! let service = pipeline.service();
//! ```

use std::sync::Arc;
use std::time::Duration;

use chainwatch_core::{Pipeline, SenderRecovery, SubscriberRegistry, TransactionStore, WatchError, WatcherConfig};

use crate::http::{HttpClientConfig, HttpRpcClient};
use crate::retry::RetryConfig;
use crate::signer::EvmSigner;
use crate::ws::WsHeaderSource;

/// Fluent builder for a `Pipeline` backed by JSON-RPC connections.
#[derive(Default)]
pub struct WatcherBuilder {
    http_url: Option<String>,
    ws_url: Option<String>,
    config: WatcherConfig,
    http: HttpClientConfig,
    recovery: Option<Arc<dyn SenderRecovery>>,
    registry: Option<Arc<dyn SubscriberRegistry>>,
    store: Option<Arc<dyn TransactionStore>>,
}

impl WatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Endpoint for `eth_getBlockByHash`.
    pub fn http_url(mut self, url: impl Into<String>) -> Self {
        self.http_url = Some(url.into());
        self
    }

    /// Endpoint for the `newHeads` subscription.
    pub fn ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = Some(url.into());
        self
    }

    pub fn config(mut self, config: WatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn resubscribe_delay(mut self, delay: Duration) -> Self {
        self.config.resubscribe_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.http.request_timeout = timeout;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.http.retry = retry;
        self
    }

    /// Replace the default `EvmSigner`.
    pub fn recovery(mut self, recovery: Arc<dyn SenderRecovery>) -> Self {
        self.recovery = Some(recovery);
        self
    }

    pub fn registry(mut self, registry: Arc<dyn SubscriberRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn store(mut self, store: Arc<dyn TransactionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the pipeline. Fails if an endpoint or a storage backend is
    /// missing.
    pub fn build(self) -> Result<Pipeline, WatchError> {
        let http_url = self.http_url.ok_or_else(|| WatchError::Config("http_url is required".into()))?;
        let ws_url = self.ws_url.ok_or_else(|| WatchError::Config("ws_url is required".into()))?;
        let registry = self.registry.ok_or_else(|| WatchError::Config("a subscriber registry is required".into()))?;
        let store = self.store.ok_or_else(|| WatchError::Config("a transaction store is required".into()))?;
        if self.config.queue_capacity == 0 {
            return Err(WatchError::Config("queue_capacity must be at least 1".into()));
        }

        let fetcher = HttpRpcClient::new(http_url, self.http).map_err(|e| WatchError::Config(e.to_string()))?;
        let recovery = self.recovery.unwrap_or_else(|| Arc::new(EvmSigner::new()));

        Ok(Pipeline::new(
            self.config,
            Arc::new(WsHeaderSource::new(ws_url)),
            Arc::new(fetcher),
            recovery,
            registry,
            store,
        ))
    }
}
