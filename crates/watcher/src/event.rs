//! Events emitted by the watcher and the two ways to consume them
//!
//! Push: handlers registered with `on*` are called synchronously, in
//! registration order, for every event.
//! Pull: a [`Changes`] reader waits for the next change. Only readers that
//! are waiting when an event is emitted receive it; nothing is queued.

use crate::error::WatchError;
use futures::Stream;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Kind of a change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// A path appeared or disappeared
    Rename,
    /// A path's metadata changed
    Change,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rename => "rename",
            Self::Change => "change",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detached change notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    /// Event type
    pub kind: ChangeKind,
    /// Path relative to the watch root; empty for the root itself
    pub path: PathBuf,
}

impl ChangeEvent {
    pub fn rename(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: ChangeKind::Rename,
            path: path.into(),
        }
    }

    pub fn change(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: ChangeKind::Change,
            path: path.into(),
        }
    }
}

/// Everything a push subscriber can observe
#[derive(Debug, Clone)]
pub enum WatcherEvent {
    Change(ChangeEvent),
    Error(Arc<WatchError>),
    Close,
}

/// Item produced by a pull reader
pub type PullItem = Result<ChangeEvent, Arc<WatchError>>;

/// Handle returned by handler registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Arc<dyn Fn(&WatcherEvent) + Send + Sync>;

#[derive(Default)]
struct PullSlots {
    closed: bool,
    waiters: Vec<oneshot::Sender<PullItem>>,
}

/// Fan-out of events to push handlers and waiting pull readers
#[derive(Default)]
pub struct Dispatcher {
    handlers: RwLock<Vec<(HandlerId, Handler)>>,
    pull: Mutex<PullSlots>,
    next_id: AtomicU64,
    emitted: AtomicU64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&WatcherEvent) + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push((id, Arc::new(handler)));
        id
    }

    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    /// Deliver a change or error; ignored once closed
    pub fn emit(&self, event: WatcherEvent) {
        {
            let mut pull = self.pull.lock();
            if pull.closed {
                return;
            }

            let item = match &event {
                WatcherEvent::Change(change) => Some(Ok(change.clone())),
                WatcherEvent::Error(err) => Some(Err(err.clone())),
                WatcherEvent::Close => None,
            };
            if let Some(item) = item {
                for waiter in pull.waiters.drain(..) {
                    let _ = waiter.send(item.clone());
                }
            }
        }

        self.emitted.fetch_add(1, Ordering::Relaxed);
        self.notify(&event);
    }

    /// Finish every pull reader and deliver `Close` exactly once
    pub fn close(&self) {
        {
            let mut pull = self.pull.lock();
            if pull.closed {
                return;
            }
            pull.closed = true;
            pull.waiters.clear();
        }

        self.notify(&WatcherEvent::Close);
    }

    pub fn is_closed(&self) -> bool {
        self.pull.lock().closed
    }

    /// Events delivered so far, excluding `Close`
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Park a pull reader; `None` once closed
    fn wait(&self) -> Option<oneshot::Receiver<PullItem>> {
        let mut pull = self.pull.lock();
        if pull.closed {
            return None;
        }
        pull.waiters.retain(|waiter| !waiter.is_closed());

        let (tx, rx) = oneshot::channel();
        pull.waiters.push(tx);
        Some(rx)
    }

    fn notify(&self, event: &WatcherEvent) {
        // Snapshot so handlers may (un)subscribe or close re-entrantly
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in handlers {
            handler(event);
        }
    }
}

/// Pull-style reader over a watcher's changes
///
/// Each [`Changes::next`] waits for the next change emitted after the call.
/// Error events fail the waiting step. Once the watcher is closed every
/// call returns `None` immediately.
pub struct Changes {
    dispatcher: Arc<Dispatcher>,
}

impl Changes {
    pub(crate) fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Wait for the next change; `None` when the watcher is closed
    pub async fn next(&mut self) -> Option<PullItem> {
        let waiter = self.dispatcher.wait()?;
        waiter.await.ok()
    }

    /// Adapt into a [`Stream`] that ends when the watcher closes
    pub fn into_stream(self) -> impl Stream<Item = PullItem> + Send + 'static {
        futures::stream::unfold(self, |mut changes| async move {
            let item = changes.next().await?;
            Some((item, changes))
        })
    }
}

impl fmt::Debug for Changes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Changes")
            .field("closed", &self.dispatcher.is_closed())
            .finish()
    }
}
