//! Recursive tree enumeration
//!
//! Builds a flat snapshot of every entry reachable from a starting path.
//! Used both for the initial scan and for scoped directory rescans.

use crate::error::{Result, WatchError};
use crate::ignore::IgnoreRules;
use crate::metadata::MetadataRecord;
use crate::platform::{DirEntryInfo, FsProbe};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Kind and metadata of an enumerated entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedEntry {
    /// Entry is (or, when following links, resolves to) a directory
    pub is_directory: bool,
    /// Entry is a symbolic link
    pub is_symlink: bool,
    /// Metadata read during the scan (through links; missing for dangling ones)
    pub record: MetadataRecord,
}

/// Flat snapshot produced by [`TreeEnumerator::enumerate`]
pub type Snapshot = BTreeMap<PathBuf, ScannedEntry>;

/// Recursive directory walker over an [`FsProbe`]
pub struct TreeEnumerator<'a> {
    probe: &'a dyn FsProbe,
    rules: &'a IgnoreRules,
    follow_symlinks: bool,
    scope: Option<&'a Path>,
}

impl<'a> TreeEnumerator<'a> {
    pub fn new(probe: &'a dyn FsProbe, rules: &'a IgnoreRules, follow_symlinks: bool) -> Self {
        Self {
            probe,
            rules,
            follow_symlinks,
            scope: None,
        }
    }

    /// Treat `root` as the top of the tree being enumerated
    ///
    /// When following links, a scan started below `root` refuses links back
    /// into any directory between its start and `root`, exactly as a scan
    /// of `root` itself would.
    pub fn within(mut self, root: &'a Path) -> Self {
        self.scope = Some(root);
        self
    }

    /// Enumerate `start` and every descendant into `out`
    ///
    /// Failing to stat or list `start` itself is an error. Sub-directories
    /// that cannot be listed (deleted mid-scan, permission denied) are
    /// recorded but not descended into.
    pub async fn enumerate(&self, start: &Path, out: &mut Snapshot) -> Result<()> {
        let record = self
            .probe
            .stat(start)
            .await
            .map_err(|e| WatchError::enumeration(start, e))?;

        out.insert(
            start.to_path_buf(),
            ScannedEntry {
                is_directory: record.is_directory,
                is_symlink: false,
                record,
            },
        );

        if !record.is_directory {
            return Ok(());
        }

        let mut visited = self.seed_visited(start).await;

        let entries = self
            .probe
            .list(start)
            .await
            .map_err(|e| WatchError::enumeration(start, e))?;

        // Explicit stack: depth is unbounded
        let mut pending = vec![(start.to_path_buf(), entries)];

        while let Some((dir, entries)) = pending.pop() {
            for entry in entries {
                let path = dir.join(&entry.name);
                let Some((scanned, descend)) = self.resolve(&path, &entry, &mut visited).await
                else {
                    continue;
                };

                if self.rules.should_ignore(&path, scanned.is_directory) {
                    continue;
                }

                out.insert(path.clone(), scanned);

                if !descend {
                    continue;
                }

                match self.probe.list(&path).await {
                    Ok(children) => pending.push((path, children)),
                    Err(e) => debug!("Skipping unreadable directory {}: {}", path.display(), e),
                }
            }
        }

        Ok(())
    }

    /// Canonical forms of `start` and its ancestors up to the scope root
    async fn seed_visited(&self, start: &Path) -> HashSet<PathBuf> {
        let mut visited = HashSet::new();
        if !self.follow_symlinks {
            return visited;
        }

        let scope = self.scope.unwrap_or(start);
        let ancestors = std::iter::once(start)
            .chain(start.ancestors().skip(1).take_while(|dir| dir.starts_with(scope)));
        for dir in ancestors {
            if let Ok(canonical) = self.probe.canonicalize(dir).await {
                visited.insert(canonical);
            }
        }
        visited
    }

    /// Stat the entry and decide whether to descend into it
    ///
    /// `None` when a regular entry vanished (or became unreadable) between
    /// listing and stat.
    async fn resolve(
        &self,
        path: &Path,
        entry: &DirEntryInfo,
        visited: &mut HashSet<PathBuf>,
    ) -> Option<(ScannedEntry, bool)> {
        let stat = self.probe.stat(path).await;

        if !entry.is_symlink {
            let record = match stat {
                Ok(record) => record,
                Err(e) => {
                    debug!("Skipping {}: {}", path.display(), e);
                    return None;
                }
            };
            if entry.is_directory && self.follow_symlinks {
                if let Ok(canonical) = self.probe.canonicalize(path).await {
                    visited.insert(canonical);
                }
            }
            let scanned = ScannedEntry {
                is_directory: entry.is_directory,
                is_symlink: false,
                record,
            };
            return Some((scanned, entry.is_directory));
        }

        // Dangling links stay leaves with a missing record
        let record = stat.unwrap_or(MetadataRecord::MISSING);
        let leaf = ScannedEntry {
            is_directory: false,
            is_symlink: true,
            record,
        };
        if !self.follow_symlinks || !record.is_directory {
            return Some((leaf, false));
        }

        let scanned = ScannedEntry {
            is_directory: true,
            is_symlink: true,
            record,
        };
        let descend = match self.probe.canonicalize(path).await {
            Ok(canonical) => visited.insert(canonical),
            Err(_) => false,
        };
        if !descend {
            debug!("Not descending into already visited link {}", path.display());
        }
        Some((scanned, descend))
    }
}
