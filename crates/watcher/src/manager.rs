//! Watch-set manager
//!
//! Owns the [`WatchSet`], starts and stops per-path pollers, and turns poll
//! ticks into events. Poller callbacks only enqueue a [`Tick`]; a single
//! processor task handles each tick to completion (including any rescan)
//! before taking the next one, and re-checks `closed` after every await.

use crate::classify::{classify, ChangeClass};
use crate::config::WatcherConfig;
use crate::diagnostics::{Counters, WatcherDiagnostics};
use crate::enumerate::{ScannedEntry, Snapshot, TreeEnumerator};
use crate::error::{Result, WatchError};
use crate::event::{ChangeEvent, ChangeKind, Dispatcher, WatcherEvent};
use crate::ignore::IgnoreRules;
use crate::metadata::MetadataRecord;
use crate::platform::{FsProbe, StatPoller};
use crate::poller::PollerAdapter;
use crate::watch_set::{WatchSet, WatchedPath};
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, trace, warn};

/// One poller callback, queued for the processor
#[derive(Debug)]
pub(crate) struct Tick {
    path: PathBuf,
    generation: u64,
    previous: MetadataRecord,
    current: MetadataRecord,
}

pub(crate) struct Engine {
    state: Mutex<WatchSet>,
    poller: PollerAdapter,
    probe: Arc<dyn FsProbe>,
    config: WatcherConfig,
    rules: RwLock<Arc<IgnoreRules>>,
    dispatcher: Arc<Dispatcher>,
    tick_tx: Mutex<Option<UnboundedSender<Tick>>>,
    tick_rx: Mutex<Option<UnboundedReceiver<Tick>>>,
    next_generation: AtomicU64,
    counters: Counters,
}

impl Engine {
    pub(crate) fn new(
        config: WatcherConfig,
        probe: Arc<dyn FsProbe>,
        primitive: Arc<dyn StatPoller>,
    ) -> Self {
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();

        Self {
            state: Mutex::new(WatchSet::new()),
            poller: PollerAdapter::new(primitive, config.poll_interval()),
            probe,
            rules: RwLock::new(Arc::new(IgnoreRules::empty(Path::new("")))),
            config,
            dispatcher: Arc::new(Dispatcher::new()),
            tick_tx: Mutex::new(Some(tick_tx)),
            tick_rx: Mutex::new(Some(tick_rx)),
            next_generation: AtomicU64::new(0),
            counters: Counters::default(),
        }
    }

    pub(crate) fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Enumerate `root`, arm a poller per path and spawn the tick processor
    pub(crate) async fn start(self: &Arc<Self>, root: PathBuf) -> Result<()> {
        self.config.validate()?;
        let root = absolute(root)?;

        {
            let mut set = self.state.lock();
            if set.is_closed() {
                return Err(WatchError::Closed);
            }
            if set.is_started() {
                return Err(WatchError::AlreadyStarted);
            }
            set.begin(root.clone());
        }

        let snapshot = match self.initial_scan(&root).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                let mut set = self.state.lock();
                if !set.is_closed() {
                    set.abort_start();
                }
                return Err(err);
            }
        };

        let ticks = self.tick_rx.lock().take();
        {
            let mut set = self.state.lock();
            if set.is_closed() {
                debug!("Closed during initial scan of {}", root.display());
                return Ok(());
            }
            for (path, entry) in snapshot {
                if let Err(err) = self.watch_locked(&mut set, path, &entry) {
                    self.unwatch_subtree_locked(&mut set, &root);
                    set.abort_start();
                    *self.tick_rx.lock() = ticks;
                    return Err(err);
                }
            }
            info!("Watching {} paths under {}", set.len(), root.display());
        }

        if let Some(ticks) = ticks {
            tokio::spawn(Arc::clone(self).run(ticks));
        }
        Ok(())
    }

    async fn initial_scan(&self, root: &Path) -> Result<Snapshot> {
        let rules = Arc::new(IgnoreRules::load(root, &self.config.ignore)?);
        *self.rules.write() = rules.clone();

        let mut snapshot = Snapshot::new();
        TreeEnumerator::new(self.probe.as_ref(), &rules, self.config.follow_symlinks)
            .enumerate(root, &mut snapshot)
            .await?;
        Ok(snapshot)
    }

    /// Stop every poller, clear the watch set and emit `Close` once
    pub(crate) fn close(&self) {
        {
            let mut set = self.state.lock();
            if set.is_closed() {
                return;
            }
            for watched in set.close() {
                self.poller.stop_polling(&watched.path);
            }
            self.poller.shutdown();
            self.tick_tx.lock().take();
        }
        self.tick_rx.lock().take();

        self.dispatcher.close();
        info!("Watcher closed");
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().is_closed()
    }

    pub(crate) fn root(&self) -> Option<PathBuf> {
        self.state.lock().root().map(Path::to_path_buf)
    }

    pub(crate) fn watched_paths(&self) -> Vec<PathBuf> {
        self.state.lock().paths().map(Path::to_path_buf).collect()
    }

    pub(crate) fn diagnostics(&self) -> WatcherDiagnostics {
        WatcherDiagnostics {
            watched_paths: self.state.lock().len(),
            ticks_processed: Counters::read(&self.counters.ticks),
            rescans: Counters::read(&self.counters.rescans),
            events_emitted: self.dispatcher.emitted(),
            errors: Counters::read(&self.counters.errors),
        }
    }

    async fn run(self: Arc<Self>, mut ticks: UnboundedReceiver<Tick>) {
        while let Some(tick) = ticks.recv().await {
            let closed = self.state.lock().is_closed();
            if closed {
                break;
            }
            self.handle_tick(tick).await;
            Counters::bump(&self.counters.ticks);
        }
        debug!("Tick processor stopped");
    }

    async fn handle_tick(&self, tick: Tick) {
        let verdict = classify(&tick.previous, &tick.current);
        let mut pending = Vec::new();
        let traversable;

        {
            let mut set = self.state.lock();
            if set.is_closed() {
                return;
            }

            // Links left untraversed are leaves even when they resolve to directories
            traversable = match set.get_mut(&tick.path) {
                Some(watched) if watched.generation == tick.generation => {
                    watched.observe(tick.current);
                    !watched.is_symlink || self.config.follow_symlinks
                }
                _ => {
                    trace!("Dropping stale tick for {}", tick.path.display());
                    return;
                }
            };

            match verdict.kind {
                ChangeClass::Unchanged => {
                    trace!("Spurious tick for {}", tick.path.display());
                    return;
                }
                ChangeClass::Removed { cascade } => {
                    let removed = self.unwatch_subtree_locked(&mut set, &tick.path);
                    debug!(
                        "{} removed ({} watched paths dropped, cascade: {})",
                        tick.path.display(),
                        removed,
                        cascade
                    );
                    pending.push(change_event(&set, ChangeKind::Rename, &tick.path));
                }
                ChangeClass::FileModified => {
                    pending.push(change_event(&set, ChangeKind::Change, &tick.path));
                }
                ChangeClass::DirectoryModified if !traversable => {
                    pending.push(change_event(&set, ChangeKind::Change, &tick.path));
                }
                ChangeClass::DirectoryModified => {}
            }
        }

        self.emit_all(pending);

        if verdict.rescan_directory && traversable {
            self.rescan(&tick.path).await;
        }
    }

    /// Re-enumerate `dir` and reconcile its subtree with the watch set
    async fn rescan(&self, dir: &Path) {
        Counters::bump(&self.counters.rescans);
        let rules = self.rules.read().clone();
        let Some(root) = self.root() else {
            return;
        };

        let mut fresh = Snapshot::new();
        let outcome = TreeEnumerator::new(self.probe.as_ref(), &rules, self.config.follow_symlinks)
            .within(&root)
            .enumerate(dir, &mut fresh)
            .await;

        let mut pending = Vec::new();
        {
            let mut set = self.state.lock();
            if set.is_closed() {
                trace!("Abandoning rescan of {} after close", dir.display());
                return;
            }

            if let Err(err) = outcome {
                // The branch is gone (or unreadable): drop it as if removed
                fresh.clear();
                if err.is_not_found() {
                    debug!("{} vanished before rescan", dir.display());
                } else {
                    warn!("Rescan of {} failed: {}", dir.display(), err);
                    Counters::bump(&self.counters.errors);
                    pending.push(WatcherEvent::Error(Arc::new(err)));
                }
            }

            self.reconcile_locked(&mut set, dir, &fresh, &mut pending);
        }

        self.emit_all(pending);
    }

    fn reconcile_locked(
        &self,
        set: &mut WatchSet,
        dir: &Path,
        fresh: &Snapshot,
        pending: &mut Vec<WatcherEvent>,
    ) {
        let vanished: Vec<PathBuf> = set
            .subtree(dir)
            .filter(|path| !fresh.contains_key(*path))
            .map(Path::to_path_buf)
            .collect();

        for path in &vanished {
            if let Some(watched) = set.remove(path) {
                self.poller.stop_polling(&watched.path);
                pending.push(change_event(set, ChangeKind::Rename, path));
            }
        }

        let mut added = 0usize;
        for (path, entry) in fresh {
            if set.contains(path) {
                continue;
            }
            match self.watch_locked(set, path.clone(), entry) {
                Ok(()) => {
                    pending.push(change_event(set, ChangeKind::Rename, path));
                    added += 1;
                }
                Err(err) => {
                    warn!("{}", err);
                    Counters::bump(&self.counters.errors);
                    pending.push(WatcherEvent::Error(Arc::new(err)));
                }
            }
        }

        debug!(
            "Rescanned {}: {} added, {} removed",
            dir.display(),
            added,
            vanished.len()
        );
    }

    /// Arm a poller for `path` and insert it; caller holds the state lock
    ///
    /// Nothing is inserted when the poller cannot be armed.
    fn watch_locked(
        &self,
        set: &mut WatchSet,
        path: PathBuf,
        entry: &ScannedEntry,
    ) -> Result<()> {
        let Some(sink) = self.tick_tx.lock().clone() else {
            return Ok(());
        };

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let tick_path = path.clone();
        self.poller
            .start_polling(&path, entry.record, move |previous, current| {
                let _ = sink.send(Tick {
                    path: tick_path.clone(),
                    generation,
                    previous,
                    current,
                });
            })
            .map_err(|source| WatchError::Poll {
                path: path.clone(),
                source,
            })?;

        let mut watched = WatchedPath::new(path, entry.is_directory, generation);
        watched.is_symlink = entry.is_symlink;
        set.insert(watched);
        Ok(())
    }

    /// Remove `path` and its descendants, stopping their pollers
    fn unwatch_subtree_locked(&self, set: &mut WatchSet, path: &Path) -> usize {
        let removed = set.remove_subtree(path);
        for watched in &removed {
            self.poller.stop_polling(&watched.path);
        }
        removed.len()
    }

    fn emit_all(&self, pending: Vec<WatcherEvent>) {
        for event in pending {
            self.dispatcher.emit(event);
        }
    }
}

fn change_event(set: &WatchSet, kind: ChangeKind, path: &Path) -> WatcherEvent {
    WatcherEvent::Change(ChangeEvent {
        kind,
        path: set.relative(path),
    })
}

fn absolute(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
