//! Block listener: keeps a new-header subscription alive and feeds the hash
//! queue.
//!
//! # State machine
//!
//! ```text
//!             ┌────────────── error ──────────────┐
//!             ▼                                   │
//! Connecting ──ok──► Streaming ──error / end──► BackingOff
//!     ▲                                           │
//!     └──────────── resubscribe delay ────────────┘
//! ```
//!
//! Cancellation is observed in every state and is the only way out besides a
//! closed queue.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chain::{HeaderSource, HeaderStream};
use crate::error::WatchError;
use crate::height::ChainHeight;
use crate::queue::HashSender;
use crate::stats::PipelineStats;

enum ListenerState {
    Connecting,
    Streaming(HeaderStream),
    BackingOff,
}

/// Maintains the header subscription, records the chain height and enqueues
/// every announced block hash.
pub struct BlockListener {
    source: Arc<dyn HeaderSource>,
    height: Arc<ChainHeight>,
    stats: Arc<PipelineStats>,
    resubscribe_delay: Duration,
}

impl BlockListener {
    pub fn new(
        source: Arc<dyn HeaderSource>,
        height: Arc<ChainHeight>,
        stats: Arc<PipelineStats>,
        resubscribe_delay: Duration,
    ) -> Self {
        Self {
            source,
            height,
            stats,
            resubscribe_delay,
        }
    }

    /// Run until `cancel` fires (`Ok(())`) or the queue's consumer is gone
    /// (`Err(WatchError::QueueClosed)`).
    ///
    /// Subscription failures are logged and retried after the fixed
    /// resubscribe delay, indefinitely.
    pub async fn run(&self, sender: HashSender, cancel: CancellationToken) -> Result<(), WatchError> {
        let mut state = ListenerState::Connecting;

        loop {
            state = match state {
                ListenerState::Connecting => {
                    debug!("subscribing to new headers");
                    let subscribed = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(()),
                        res = self.source.subscribe_new_headers() => res,
                    };
                    match subscribed {
                        Ok(stream) => {
                            info!("header subscription established");
                            ListenerState::Streaming(stream)
                        }
                        Err(e) => {
                            warn!(error = %e, "header subscription failed");
                            ListenerState::BackingOff
                        }
                    }
                }

                ListenerState::Streaming(mut stream) => {
                    let item = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(()),
                        item = stream.next() => item,
                    };
                    match item {
                        Some(Ok(header)) => {
                            self.stats.header_received();
                            self.height.set(header.height);
                            debug!(height = header.height, hash = %header.hash, "new header");
                            match sender.push(header.hash, &cancel).await {
                                Ok(()) => ListenerState::Streaming(stream),
                                Err(WatchError::Cancelled) => return Ok(()),
                                Err(e) => return Err(e),
                            }
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "header subscription error");
                            ListenerState::BackingOff
                        }
                        None => {
                            warn!("header subscription closed by remote");
                            ListenerState::BackingOff
                        }
                    }
                }

                ListenerState::BackingOff => {
                    debug!(delay_ms = self.resubscribe_delay.as_millis() as u64, "resubscribing after delay");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(()),
                        _ = tokio::time::sleep(self.resubscribe_delay) => {}
                    }
                    self.stats.resubscribed();
                    ListenerState::Connecting
                }
            };
        }
    }
}
