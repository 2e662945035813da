//! Live state of one watcher: every tracked path and its last metadata

use crate::metadata::MetadataRecord;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::{Path, PathBuf};

/// One tracked filesystem entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedPath {
    /// Absolute path, unique key in the watch set
    pub path: PathBuf,
    /// Most recently observed metadata, `None` until the first tick
    pub last_metadata: Option<MetadataRecord>,
    /// Derived from the most recent metadata (or the scan)
    pub is_directory: bool,
    /// Entry is a symbolic link; its metadata is read through the link
    pub is_symlink: bool,
    /// Registration the active poller belongs to
    pub(crate) generation: u64,
}

impl WatchedPath {
    pub(crate) fn new(path: PathBuf, is_directory: bool, generation: u64) -> Self {
        Self {
            path,
            last_metadata: None,
            is_directory,
            is_symlink: false,
            generation,
        }
    }

    /// Record the metadata seen by the latest tick
    pub(crate) fn observe(&mut self, record: MetadataRecord) {
        self.is_directory = record.is_directory;
        self.last_metadata = Some(record);
    }
}

/// Mapping from absolute path to [`WatchedPath`] for one root
///
/// Keys are ordered component-wise, so a path and all of its descendants
/// form one contiguous range. Subtree queries and cascading removal walk
/// only that range.
#[derive(Debug, Default)]
pub struct WatchSet {
    root: Option<PathBuf>,
    entries: BTreeMap<PathBuf, WatchedPath>,
    closed: bool,
}

impl WatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the set to `root`
    pub(crate) fn begin(&mut self, root: PathBuf) {
        self.root = Some(root);
    }

    /// Undo [`WatchSet::begin`] after a failed start
    pub(crate) fn abort_start(&mut self) {
        self.root = None;
        self.entries.clear();
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn is_started(&self) -> bool {
        self.root.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn get(&self, path: &Path) -> Option<&WatchedPath> {
        self.entries.get(path)
    }

    pub(crate) fn get_mut(&mut self, path: &Path) -> Option<&mut WatchedPath> {
        self.entries.get_mut(path)
    }

    pub(crate) fn insert(&mut self, watched: WatchedPath) -> Option<WatchedPath> {
        self.entries.insert(watched.path.clone(), watched)
    }

    pub(crate) fn remove(&mut self, path: &Path) -> Option<WatchedPath> {
        self.entries.remove(path)
    }

    /// All tracked paths in order
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys().map(PathBuf::as_path)
    }

    /// `path` (if tracked) and every tracked descendant, in order
    pub fn subtree<'a>(&'a self, path: &'a Path) -> impl Iterator<Item = &'a Path> + 'a {
        self.entries
            .range::<Path, _>((Bound::Included(path), Bound::Unbounded))
            .map(|(key, _)| key.as_path())
            .take_while(move |key| key.starts_with(path))
    }

    /// Remove `path` and every descendant, returning them parent-first
    pub(crate) fn remove_subtree(&mut self, path: &Path) -> Vec<WatchedPath> {
        let doomed: Vec<PathBuf> = self.subtree(path).map(Path::to_path_buf).collect();
        doomed
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .collect()
    }

    /// Path relative to the root; empty for the root itself
    pub fn relative(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) => path
                .strip_prefix(root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.to_path_buf()),
            None => path.to_path_buf(),
        }
    }

    /// Mark closed and hand back every entry so its poller can be stopped
    pub(crate) fn close(&mut self) -> Vec<WatchedPath> {
        self.closed = true;
        std::mem::take(&mut self.entries).into_values().collect()
    }
}
