//! Classification of a single poll tick

use crate::metadata::MetadataRecord;

/// What a metadata transition means for the watched path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeClass {
    /// Spurious tick: nothing observable changed
    Unchanged,
    /// The path no longer exists
    Removed {
        /// The removed path was a directory; its descendants go with it
        cascade: bool,
    },
    /// A directory's contents may have changed
    DirectoryModified,
    /// A tracked file's metadata changed
    FileModified,
}

/// Result of [`classify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: ChangeClass,
    /// The directory must be re-enumerated
    pub rescan_directory: bool,
}

/// Decide what a `previous -> current` transition means
///
/// Only existence (creation time, link count), directory-ness and
/// modification time are consulted.
pub fn classify(previous: &MetadataRecord, current: &MetadataRecord) -> Classification {
    let kind = if current.link_count != 0
        && !previous.is_directory
        && !current.is_directory
        && current.modified == previous.modified
    {
        ChangeClass::Unchanged
    } else if !current.exists() && previous.exists() {
        ChangeClass::Removed {
            cascade: previous.is_directory,
        }
    } else if current.is_directory {
        ChangeClass::DirectoryModified
    } else {
        ChangeClass::FileModified
    };

    Classification {
        kind,
        rescan_directory: kind == ChangeClass::DirectoryModified,
    }
}
