//! Filesystem primitives consumed by the engine
//!
//! The engine never touches the filesystem directly. Directory listing and
//! stat go through [`FsProbe`], and per-path polling goes through
//! [`StatPoller`], so both can be swapped for deterministic fakes.

pub mod fs;
pub mod interval;

use crate::metadata::MetadataRecord;
use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub use fs::TokioFsProbe;
pub use interval::IntervalPoller;

/// One entry returned by a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    /// File name relative to the listed directory
    pub name: OsString,
    /// Entry is a directory (links are not followed)
    pub is_directory: bool,
    /// Entry is a symbolic link
    pub is_symlink: bool,
}

/// Directory lister and path stat-er
///
/// Both operations fail with the underlying I/O error kind (`NotFound`,
/// `PermissionDenied`, ...). Callers decide whether that is fatal.
#[async_trait]
pub trait FsProbe: Send + Sync {
    /// List the immediate entries of `dir`
    async fn list(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>>;

    /// Stat `path`, following symbolic links
    async fn stat(&self, path: &Path) -> io::Result<MetadataRecord>;

    /// Resolve `path` to its canonical form
    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

/// Callback invoked by a [`StatPoller`] with `(current, previous)` metadata
pub type TickFn = Arc<dyn Fn(MetadataRecord, MetadataRecord) + Send + Sync>;

/// Single-path polling primitive
///
/// Repeatedly re-reads one path's metadata (following symbolic links) on its
/// own interval and invokes the callback only when the record differs from
/// the previous read. The first read is compared against `baseline`.
pub trait StatPoller: Send + Sync {
    /// Start polling `path`; fails when no polling can be scheduled
    fn watch(
        &self,
        path: &Path,
        interval: Duration,
        baseline: MetadataRecord,
        on_tick: TickFn,
    ) -> io::Result<()>;

    /// Stop polling `path`; a no-op for paths that are not polled
    fn unwatch(&self, path: &Path);
}
