//! In-memory filesystem and hand-cranked poller for deterministic tests

use crate::metadata::MetadataRecord;
use crate::platform::{DirEntryInfo, FsProbe, StatPoller, TickFn};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy)]
struct FakeNode {
    is_dir: bool,
    created: u64,
    modified: u64,
}

/// Listing gate: the probe signals `entered` and waits for `release`
struct Gate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

/// Tree of fake files and directories with a logical clock for mtimes
pub(crate) struct FakeFs {
    nodes: Mutex<BTreeMap<PathBuf, FakeNode>>,
    clock: AtomicU64,
    denied: Mutex<HashSet<PathBuf>>,
    gate: Mutex<Option<Gate>>,
}

impl FakeFs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            nodes: Mutex::new(BTreeMap::new()),
            clock: AtomicU64::new(100),
            denied: Mutex::new(HashSet::new()),
            gate: Mutex::new(None),
        })
    }

    fn now(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn touch_parent(nodes: &mut BTreeMap<PathBuf, FakeNode>, path: &Path, now: u64) {
        if let Some(parent) = path.parent().and_then(|p| nodes.get_mut(p)) {
            parent.modified = now;
        }
    }

    fn create(&self, nodes: &mut BTreeMap<PathBuf, FakeNode>, path: &Path, is_dir: bool) {
        let ancestors: Vec<PathBuf> = path
            .ancestors()
            .skip(1)
            .filter(|p| p.parent().is_some())
            .map(Path::to_path_buf)
            .collect();
        for ancestor in ancestors.into_iter().rev() {
            if !nodes.contains_key(&ancestor) {
                let now = self.now();
                Self::touch_parent(nodes, &ancestor, now);
                nodes.insert(
                    ancestor,
                    FakeNode {
                        is_dir: true,
                        created: now,
                        modified: now,
                    },
                );
            }
        }

        let now = self.now();
        Self::touch_parent(nodes, path, now);
        nodes.insert(
            path.to_path_buf(),
            FakeNode {
                is_dir,
                created: now,
                modified: now,
            },
        );
    }

    /// `mkdir -p`
    pub fn mkdir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut nodes = self.nodes.lock();
        if !nodes.contains_key(path) {
            self.create(&mut nodes, path, true);
        }
    }

    /// Create a file (and its parents) or bump its mtime
    pub fn write(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut nodes = self.nodes.lock();
        if let Some(node) = nodes.get_mut(path) {
            node.modified = self.now();
        } else {
            self.create(&mut nodes, path, false);
        }
    }

    /// `rm -r`
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut nodes = self.nodes.lock();
        nodes.retain(|key, _| !key.starts_with(path));
        let now = self.now();
        Self::touch_parent(&mut nodes, path, now);
    }

    /// Make listing `path` fail with `PermissionDenied`
    pub fn deny(&self, path: impl AsRef<Path>) {
        self.denied.lock().insert(path.as_ref().to_path_buf());
    }

    /// Block the next listings until the returned `release` is notified
    ///
    /// Returns `(entered, release)`.
    pub fn hold_listings(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.gate.lock() = Some(Gate {
            entered: entered.clone(),
            release: release.clone(),
        });
        (entered, release)
    }

    pub fn metadata(&self, path: impl AsRef<Path>) -> MetadataRecord {
        match self.nodes.lock().get(path.as_ref()) {
            Some(node) => record(node),
            None => MetadataRecord::MISSING,
        }
    }

    /// Every path under `root` (inclusive)
    pub fn paths_under(&self, root: impl AsRef<Path>) -> Vec<PathBuf> {
        let root = root.as_ref();
        self.nodes
            .lock()
            .keys()
            .filter(|key| key.starts_with(root))
            .cloned()
            .collect()
    }
}

fn record(node: &FakeNode) -> MetadataRecord {
    MetadataRecord {
        modified: UNIX_EPOCH + Duration::from_secs(node.modified),
        created: UNIX_EPOCH + Duration::from_secs(node.created),
        link_count: if node.is_dir { 2 } else { 1 },
        is_directory: node.is_dir,
    }
}

#[async_trait]
impl FsProbe for FakeFs {
    async fn list(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        if self.denied.lock().contains(dir) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        }

        let nodes = self.nodes.lock();
        match nodes.get(dir) {
            None => return Err(io::Error::new(io::ErrorKind::NotFound, "no such directory")),
            Some(node) if !node.is_dir => {
                return Err(io::Error::new(io::ErrorKind::Other, "not a directory"))
            }
            Some(_) => {}
        }

        Ok(nodes
            .iter()
            .filter(|(key, _)| key.parent() == Some(dir))
            .filter_map(|(key, node)| {
                Some(DirEntryInfo {
                    name: key.file_name()?.to_os_string(),
                    is_directory: node.is_dir,
                    is_symlink: false,
                })
            })
            .collect())
    }

    async fn stat(&self, path: &Path) -> io::Result<MetadataRecord> {
        match self.nodes.lock().get(path) {
            Some(node) => Ok(record(node)),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "no such path")),
        }
    }

    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        if self.nodes.lock().contains_key(path) {
            Ok(path.to_path_buf())
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, "no such path"))
        }
    }
}

/// Yield to the runtime until `condition` holds (2s limit)
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

struct Registration {
    on_tick: TickFn,
    last: MetadataRecord,
}

/// [`StatPoller`] that only polls when told to
pub(crate) struct ManualPoller {
    fs: Arc<FakeFs>,
    registrations: Mutex<BTreeMap<PathBuf, Registration>>,
    refuse: AtomicBool,
}

impl ManualPoller {
    pub fn new(fs: Arc<FakeFs>) -> Arc<Self> {
        Arc::new(Self {
            fs,
            registrations: Mutex::new(BTreeMap::new()),
            refuse: AtomicBool::new(false),
        })
    }

    /// Make subsequent `watch` calls fail
    pub fn refuse_watches(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Stat every registered path once; returns how many callbacks fired
    pub fn poll_all(&self) -> usize {
        let fired: Vec<(TickFn, MetadataRecord, MetadataRecord)> = {
            let mut registrations = self.registrations.lock();
            registrations
                .iter_mut()
                .filter_map(|(path, registration)| {
                    let current = self.fs.metadata(path);
                    if current == registration.last {
                        return None;
                    }
                    let previous = std::mem::replace(&mut registration.last, current);
                    Some((registration.on_tick.clone(), current, previous))
                })
                .collect()
        };

        let count = fired.len();
        for (on_tick, current, previous) in fired {
            on_tick(current, previous);
        }
        count
    }

    /// Fire `path`'s callback with `current`, whatever the fake fs says
    pub fn fire(&self, path: impl AsRef<Path>, current: MetadataRecord) -> bool {
        let fired = {
            let mut registrations = self.registrations.lock();
            registrations.get_mut(path.as_ref()).map(|registration| {
                let previous = std::mem::replace(&mut registration.last, current);
                (registration.on_tick.clone(), previous)
            })
        };

        match fired {
            Some((on_tick, previous)) => {
                on_tick(current, previous);
                true
            }
            None => false,
        }
    }

    pub fn watched_count(&self) -> usize {
        self.registrations.lock().len()
    }

    pub fn is_watching(&self, path: impl AsRef<Path>) -> bool {
        self.registrations.lock().contains_key(path.as_ref())
    }
}

impl StatPoller for ManualPoller {
    fn watch(
        &self,
        path: &Path,
        _interval: Duration,
        baseline: MetadataRecord,
        on_tick: TickFn,
    ) -> io::Result<()> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "polling refused"));
        }
        self.registrations
            .lock()
            .entry(path.to_path_buf())
            .or_insert(Registration {
                on_tick,
                last: baseline,
            });
        Ok(())
    }

    fn unwatch(&self, path: &Path) {
        self.registrations.lock().remove(path);
    }
}
