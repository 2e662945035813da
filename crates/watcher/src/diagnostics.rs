//! Watcher counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time statistics about a watcher
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatcherDiagnostics {
    /// Paths currently in the watch set
    pub watched_paths: usize,

    /// Poll ticks fully processed
    pub ticks_processed: u64,

    /// Directory rescans performed
    pub rescans: u64,

    /// Change and error events delivered
    pub events_emitted: u64,

    /// Error events raised
    pub errors: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub ticks: AtomicU64,
    pub rescans: AtomicU64,
    pub errors: AtomicU64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn read(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
