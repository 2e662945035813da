//! Shared helpers for real-filesystem watcher tests

#![allow(dead_code)]

use filetime::{set_file_mtime, FileTime};
use parking_lot::Mutex;
use pollwatch::{ChangeEvent, ChangeKind, PollWatcher, WatcherConfig, WatcherEvent};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Interval used by every real-filesystem test
pub const TEST_INTERVAL: Duration = Duration::from_millis(20);

/// How long to wait for an expected event
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn test_config() -> WatcherConfig {
    WatcherConfig::default().with_poll_interval(TEST_INTERVAL)
}

/// Temporary tree whose writes always move mtimes forward
pub struct TestTree {
    dir: TempDir,
    clock: AtomicI64,
}

impl TestTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
            clock: AtomicI64::new(1_000_000),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Set `path`'s mtime to a strictly later, second-granular value
    pub fn bump(&self, path: &Path) {
        let seconds = self.clock.fetch_add(10, Ordering::SeqCst);
        set_file_mtime(path, FileTime::from_unix_time(seconds, 0)).expect("set mtime");
    }

    /// Write a file, creating parents, and bump it and its parent
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.path(relative);
        let parent = path.parent().expect("file has a parent").to_path_buf();
        fs::create_dir_all(&parent).expect("create parent");
        fs::write(&path, contents).expect("write file");
        self.bump(&path);
        self.bump(&parent);
        path
    }

    pub fn mkdir(&self, relative: &str) -> PathBuf {
        let path = self.path(relative);
        fs::create_dir_all(&path).expect("create dir");
        if let Some(parent) = path.parent() {
            self.bump(parent);
        }
        path
    }

    pub fn remove(&self, relative: &str) {
        let path = self.path(relative);
        if path.is_dir() {
            fs::remove_dir_all(&path).expect("remove dir");
        } else {
            fs::remove_file(&path).expect("remove file");
        }
        if let Some(parent) = path.parent() {
            self.bump(parent);
        }
    }

    /// Every path on disk under the root, sorted like the watch set
    pub fn disk_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = WalkDir::new(self.root())
            .into_iter()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.into_path())
            .collect();
        paths.sort();
        paths
    }
}

/// Records every event a watcher emits
pub struct EventLog {
    events: Arc<Mutex<Vec<WatcherEvent>>>,
}

impl EventLog {
    pub fn attach(watcher: &PollWatcher) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        watcher.on(move |event| sink.lock().push(event.clone()));
        Self { events }
    }

    pub fn changes(&self) -> Vec<ChangeEvent> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                WatcherEvent::Change(change) => Some(change.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn contains(&self, kind: ChangeKind, path: &str) -> bool {
        self.changes()
            .iter()
            .any(|change| change.kind == kind && change.path == Path::new(path))
    }

    pub fn count(&self, kind: ChangeKind, path: &str) -> usize {
        self.changes()
            .iter()
            .filter(|change| change.kind == kind && change.path == Path::new(path))
            .count()
    }

    pub fn closes(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| matches!(event, WatcherEvent::Close))
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

/// Sleep-poll until `condition` holds or [`EVENT_TIMEOUT`] passes
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + EVENT_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Let several poll intervals pass
pub async fn quiesce() {
    tokio::time::sleep(TEST_INTERVAL * 10).await;
}
