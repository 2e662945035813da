//! Timer-driven single-path stat poller

use super::{StatPoller, TickFn};
use crate::metadata::MetadataRecord;
use dashmap::DashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{trace, warn};

/// [`StatPoller`] that runs one tokio task per polled path
///
/// Each task re-stats its path every interval and fires the callback only
/// when the [`MetadataRecord`] differs from the last one it saw. Missing
/// paths read as [`MetadataRecord::MISSING`].
#[derive(Default)]
pub struct IntervalPoller {
    /// Active polling tasks keyed by path
    tasks: DashMap<PathBuf, JoinHandle<()>>,
}

impl IntervalPoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of paths currently polled
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Whether `path` has an active polling task
    pub fn is_watching(&self, path: &Path) -> bool {
        self.tasks.contains_key(path)
    }
}

impl StatPoller for IntervalPoller {
    fn watch(
        &self,
        path: &Path,
        interval: Duration,
        baseline: MetadataRecord,
        on_tick: TickFn,
    ) -> io::Result<()> {
        if self.tasks.contains_key(path) {
            trace!("Already polling {}", path.display());
            return Ok(());
        }

        let runtime = Handle::try_current().map_err(|e| {
            io::Error::new(
                io::ErrorKind::Other,
                format!("cannot poll {} outside a tokio runtime: {}", path.display(), e),
            )
        })?;

        let task_path = path.to_path_buf();
        let handle = runtime.spawn(poll_loop(task_path, interval, baseline, on_tick));
        self.tasks.insert(path.to_path_buf(), handle);
        Ok(())
    }

    fn unwatch(&self, path: &Path) {
        if let Some((_, handle)) = self.tasks.remove(path) {
            handle.abort();
        }
    }
}

impl Drop for IntervalPoller {
    fn drop(&mut self) {
        for entry in self.tasks.iter() {
            entry.value().abort();
        }
    }
}

async fn poll_loop(path: PathBuf, period: Duration, baseline: MetadataRecord, on_tick: TickFn) {
    let mut previous = baseline;
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        timer.tick().await;

        let Some(current) = read(&path).await else {
            continue;
        };

        if current != previous {
            trace!("Metadata changed for {}", path.display());
            on_tick(current, previous);
            previous = current;
        }
    }
}

/// Stat through symbolic links; `None` when the read failed for a reason
/// other than the path being absent
async fn read(path: &Path) -> Option<MetadataRecord> {
    match tokio::fs::metadata(path).await {
        Ok(md) => Some(MetadataRecord::from_metadata(&md)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Some(MetadataRecord::MISSING),
        Err(e) => {
            warn!("Failed to stat {}: {}", path.display(), e);
            None
        }
    }
}
