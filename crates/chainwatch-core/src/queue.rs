//! Bounded single-producer / single-consumer queue of pending block hashes.
//!
//! A full queue makes [`HashSender::push`] wait; nothing is ever dropped.
//! This is the only backpressure between header ingestion and block
//! processing.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::WatchError;
use crate::types::BlockHash;

/// Default number of hashes buffered between listener and processor.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Create a hash queue holding at most `capacity` pending hashes.
///
/// A capacity of zero is raised to one.
pub fn hash_queue(capacity: usize) -> (HashSender, HashReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (HashSender { tx }, HashReceiver { rx })
}

/// Producer half of the hash queue.
#[derive(Debug, Clone)]
pub struct HashSender {
    tx: mpsc::Sender<BlockHash>,
}

impl HashSender {
    /// Enqueue `hash`, waiting while the queue is full.
    ///
    /// Returns [`WatchError::Cancelled`] if `cancel` fires first and
    /// [`WatchError::QueueClosed`] if the receiver is gone.
    pub async fn push(&self, hash: BlockHash, cancel: &CancellationToken) -> Result<(), WatchError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(WatchError::Cancelled),
            res = self.tx.send(hash) => res.map_err(|_| WatchError::QueueClosed),
        }
    }
}

/// Consumer half of the hash queue.
#[derive(Debug)]
pub struct HashReceiver {
    rx: mpsc::Receiver<BlockHash>,
}

impl HashReceiver {
    /// Dequeue the oldest hash, waiting while the queue is empty.
    ///
    /// `Ok(None)` means every sender has been dropped and the queue is
    /// drained.
    pub async fn pop(&mut self, cancel: &CancellationToken) -> Result<Option<BlockHash>, WatchError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(WatchError::Cancelled),
            hash = self.rx.recv() => Ok(hash),
        }
    }
}
