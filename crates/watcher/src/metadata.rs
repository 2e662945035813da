//! Portable metadata snapshot used to detect changes between polls

use std::fs::Metadata;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Minimal, comparable snapshot of a path's state
///
/// A `created` time of `UNIX_EPOCH` (zero) means the path does not exist.
/// A `link_count` of zero is an auxiliary "does not exist" signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataRecord {
    /// Last content/metadata modification
    pub modified: SystemTime,
    /// Creation time, zero when the path is missing
    pub created: SystemTime,
    /// Number of hard links
    pub link_count: u64,
    /// Whether the path is a directory
    pub is_directory: bool,
}

impl MetadataRecord {
    /// Record reported for a path that does not exist
    pub const MISSING: Self = Self {
        modified: UNIX_EPOCH,
        created: UNIX_EPOCH,
        link_count: 0,
        is_directory: false,
    };

    /// Build a record from filesystem metadata
    ///
    /// Creation time falls back to the inode change time, then to the
    /// modification time, on platforms without birth time.
    pub fn from_metadata(md: &Metadata) -> Self {
        let modified = md.modified().unwrap_or(UNIX_EPOCH);
        let created = md
            .created()
            .ok()
            .or_else(|| change_time(md))
            .unwrap_or(modified);

        Self {
            modified,
            created,
            link_count: link_count(md),
            is_directory: md.is_dir(),
        }
    }

    /// Whether this record describes an existing path
    pub fn exists(&self) -> bool {
        self.created != UNIX_EPOCH
    }
}

impl Default for MetadataRecord {
    fn default() -> Self {
        Self::MISSING
    }
}

#[cfg(unix)]
fn change_time(md: &Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;

    let secs = u64::try_from(md.ctime()).ok()?;
    let nanos = u32::try_from(md.ctime_nsec()).unwrap_or(0);
    Some(UNIX_EPOCH + Duration::new(secs, nanos))
}

#[cfg(not(unix))]
fn change_time(_md: &Metadata) -> Option<SystemTime> {
    None
}

#[cfg(unix)]
fn link_count(md: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    md.nlink()
}

#[cfg(not(unix))]
fn link_count(_md: &Metadata) -> u64 {
    1
}
