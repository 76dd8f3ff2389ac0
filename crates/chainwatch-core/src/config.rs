//! Pipeline configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::queue::DEFAULT_QUEUE_CAPACITY;

/// Tuning knobs for the listener / processor pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Maximum number of block hashes buffered between listener and processor.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Fixed delay before re-subscribing after the header stream fails.
    #[serde(default = "default_resubscribe_delay_ms")]
    pub resubscribe_delay_ms: u64,
}

fn default_queue_capacity() -> usize { DEFAULT_QUEUE_CAPACITY }
fn default_resubscribe_delay_ms() -> u64 { 3_000 }

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            resubscribe_delay_ms: default_resubscribe_delay_ms(),
        }
    }
}

impl WatcherConfig {
    pub fn resubscribe_delay(&self) -> Duration {
        Duration::from_millis(self.resubscribe_delay_ms)
    }
}
