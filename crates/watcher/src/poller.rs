//! Adapter over the single-path polling primitive
//!
//! Guarantees at most one registration per path and normalizes the
//! primitive's `(current, previous)` callback into `(previous, current)`.

use crate::metadata::MetadataRecord;
use crate::platform::{StatPoller, TickFn};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Registers and cancels per-path polls on a [`StatPoller`]
pub struct PollerAdapter {
    primitive: Arc<dyn StatPoller>,
    interval: Duration,
    active: Mutex<HashSet<PathBuf>>,
}

impl PollerAdapter {
    pub fn new(primitive: Arc<dyn StatPoller>, interval: Duration) -> Self {
        Self {
            primitive,
            interval,
            active: Mutex::new(HashSet::new()),
        }
    }

    /// Start polling `path` from `baseline`; `on_tick` receives
    /// `(previous, current)`
    ///
    /// An existing registration for the same path is replaced. When the
    /// primitive refuses the registration the path is left unpolled.
    pub fn start_polling<F>(
        &self,
        path: &Path,
        baseline: MetadataRecord,
        on_tick: F,
    ) -> io::Result<()>
    where
        F: Fn(MetadataRecord, MetadataRecord) + Send + Sync + 'static,
    {
        let mut active = self.active.lock();
        if !active.insert(path.to_path_buf()) {
            trace!("Replacing poll registration for {}", path.display());
            self.primitive.unwatch(path);
        }

        let callback: TickFn = Arc::new(move |current, previous| on_tick(previous, current));
        if let Err(err) = self.primitive.watch(path, self.interval, baseline, callback) {
            active.remove(path);
            return Err(err);
        }
        Ok(())
    }

    /// Stop polling `path`; idempotent
    pub fn stop_polling(&self, path: &Path) {
        if self.active.lock().remove(path) {
            self.primitive.unwatch(path);
        }
    }

    /// Stop every registration
    pub fn shutdown(&self) {
        let drained: Vec<PathBuf> = self.active.lock().drain().collect();
        for path in drained {
            self.primitive.unwatch(&path);
        }
    }

    /// Number of active registrations
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    pub fn is_polling(&self, path: &Path) -> bool {
        self.active.lock().contains(path)
    }
}
