//! chainwatch-evm: JSON-RPC chain connections and sender recovery for EVM
//! chains.
//!
//! - [`HttpRpcClient`]: `BlockFetcher` over HTTP (`eth_getBlockByHash`)
//! - [`WsHeaderSource`]: `HeaderSource` over WebSocket (`eth_subscribe("newHeads")`)
//! - [`EvmSigner`]: `SenderRecovery` for transaction types 0–4
//! - [`WatcherBuilder`]: wires the above into a `chainwatch_core::Pipeline`

pub mod block;
pub mod builder;
pub mod error;
pub mod http;
pub mod quantity;
pub mod request;
pub mod retry;
pub mod signer;
pub mod ws;

pub use builder::WatcherBuilder;
pub use error::TransportError;
pub use http::{HttpClientConfig, HttpRpcClient};
pub use retry::{RetryConfig, RetryPolicy};
pub use signer::EvmSigner;
pub use ws::WsHeaderSource;
