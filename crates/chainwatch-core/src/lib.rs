//! chainwatch-core: block watching pipeline and query facade.
//!
//! # Architecture
//!
//! ```text
//! HeaderSource ─► BlockListener ─► HashQueue ─► BlockProcessor ─► TransactionStore
//!                     │                              │
//!                     └─► ChainHeight                ├─► BlockFetcher
//!                                                    ├─► SenderRecovery
//!                                                    └─► SubscriberRegistry
//!
//! Pipeline (supervisor)      WatchService (height / subscribe / txs / stats)
//! ```
//!
//! Chain connections and storage backends live in `chainwatch-evm` and
//! `chainwatch-storage`; this crate only defines the ports they implement.

pub mod chain;
pub mod config;
pub mod error;
pub mod height;
pub mod listener;
pub mod pipeline;
pub mod processor;
pub mod queue;
pub mod service;
pub mod stats;
pub mod store;
pub mod types;

#[cfg(test)]
mod testing;

pub use chain::{BlockFetcher, HeaderSource, HeaderStream, SenderRecovery};
pub use config::WatcherConfig;
pub use error::WatchError;
pub use height::ChainHeight;
pub use listener::BlockListener;
pub use pipeline::Pipeline;
pub use processor::BlockProcessor;
pub use queue::{hash_queue, HashReceiver, HashSender, DEFAULT_QUEUE_CAPACITY};
pub use service::WatchService;
pub use stats::{PipelineStats, StatsSnapshot};
pub use store::{SubscriberRegistry, TransactionStore};
pub use types::{Address, Block, BlockHash, BlockHeader, SignedTransaction, Transaction};
