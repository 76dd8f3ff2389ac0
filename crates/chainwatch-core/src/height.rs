//! Latest observed chain height.

use std::sync::atomic::{AtomicU64, Ordering};

/// The height of the most recently announced header.
///
/// Written only by the listener, read by any number of query tasks. Updates
/// are last-write-wins: a lower height announced after a higher one replaces
/// it.
#[derive(Debug, Default)]
pub struct ChainHeight(AtomicU64);

impl ChainHeight {
    pub fn new() -> Self {
        Self::default()
    }

    /// `0` until the first header is observed.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, height: u64) {
        self.0.store(height, Ordering::Relaxed);
    }
}
