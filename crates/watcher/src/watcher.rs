//! Public watcher handle

use crate::config::WatcherConfig;
use crate::diagnostics::WatcherDiagnostics;
use crate::error::{Result, WatchError};
use crate::event::{ChangeEvent, Changes, HandlerId, WatcherEvent};
use crate::manager::Engine;
use crate::platform::{FsProbe, IntervalPoller, StatPoller, TokioFsProbe};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recursive watcher built on periodic stat polling
///
/// Call [`PollWatcher::start`] once, consume events through handlers
/// ([`PollWatcher::on_change`] and friends) or a pull reader
/// ([`PollWatcher::changes`]), and [`PollWatcher::close`] when done.
/// Dropping the handle closes the watcher.
pub struct PollWatcher {
    engine: Arc<Engine>,
}

impl PollWatcher {
    /// Watcher over the real filesystem
    pub fn new(config: WatcherConfig) -> Self {
        let probe = Arc::new(TokioFsProbe::new());
        let poller = Arc::new(IntervalPoller::new());
        Self::with_backends(config, probe, poller)
    }

    /// Watcher over caller-supplied listing/stat and polling primitives
    pub fn with_backends(
        config: WatcherConfig,
        probe: Arc<dyn FsProbe>,
        poller: Arc<dyn StatPoller>,
    ) -> Self {
        Self {
            engine: Arc::new(Engine::new(config, probe, poller)),
        }
    }

    /// Scan `root` and start polling every path under it
    ///
    /// Call once. Fails if the root cannot be enumerated, if the watcher
    /// is already started, or after [`PollWatcher::close`].
    pub async fn start(&self, root: impl AsRef<Path>) -> Result<()> {
        self.engine.start(root.as_ref().to_path_buf()).await
    }

    /// Stop all polling and emit `Close`; safe to call repeatedly
    pub fn close(&self) {
        self.engine.close();
    }

    pub fn is_closed(&self) -> bool {
        self.engine.is_closed()
    }

    /// Register a handler for every event
    pub fn on<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&WatcherEvent) + Send + Sync + 'static,
    {
        self.engine.dispatcher().subscribe(handler)
    }

    /// Register a handler for change events
    pub fn on_change<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.on(move |event| {
            if let WatcherEvent::Change(change) = event {
                handler(change);
            }
        })
    }

    /// Register a handler for error events
    pub fn on_error<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&WatchError) + Send + Sync + 'static,
    {
        self.on(move |event| {
            if let WatcherEvent::Error(err) = event {
                handler(err);
            }
        })
    }

    /// Register a handler for the close event
    pub fn on_close<F>(&self, handler: F) -> HandlerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on(move |event| {
            if let WatcherEvent::Close = event {
                handler();
            }
        })
    }

    /// Remove a handler; returns whether it was registered
    pub fn off(&self, id: HandlerId) -> bool {
        self.engine.dispatcher().unsubscribe(id)
    }

    /// New pull reader over this watcher's changes
    pub fn changes(&self) -> Changes {
        Changes::new(self.engine.dispatcher().clone())
    }

    /// Keeping the process alive is not available for polling watchers
    pub fn ref_process(&self) -> Result<()> {
        Err(WatchError::Unsupported { operation: "ref" })
    }

    /// Releasing the process is not available for polling watchers
    pub fn unref_process(&self) -> Result<()> {
        Err(WatchError::Unsupported { operation: "unref" })
    }

    /// Absolute root, once started
    pub fn root(&self) -> Option<PathBuf> {
        self.engine.root()
    }

    /// Sorted absolute paths currently watched
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.engine.watched_paths()
    }

    pub fn diagnostics(&self) -> WatcherDiagnostics {
        self.engine.diagnostics()
    }
}

impl Drop for PollWatcher {
    fn drop(&mut self) {
        self.engine.close();
    }
}

impl fmt::Debug for PollWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollWatcher")
            .field("root", &self.root())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Create a watcher for `root` and start it
pub async fn watch(root: impl AsRef<Path>, config: WatcherConfig) -> Result<PollWatcher> {
    let watcher = PollWatcher::new(config);
    watcher.start(root).await?;
    Ok(watcher)
}
