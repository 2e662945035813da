//! Error types for the polling watcher

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for watcher operations
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors surfaced by the polling watcher
#[derive(Debug, Error)]
pub enum WatchError {
    /// Listing or stat-ing a path failed
    #[error("failed to enumerate {}: {source}", path.display())]
    Enumeration {
        /// Path whose enumeration failed
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// The polling primitive refused to poll a path
    #[error("failed to poll {}: {source}", path.display())]
    Poll {
        /// Path that could not be polled
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Operation the polling engine cannot provide
    #[error("`{operation}` is not supported by the polling watcher")]
    Unsupported {
        /// Name of the rejected operation
        operation: &'static str,
    },

    /// `start` was called on a watcher that is already running
    #[error("watcher has already been started")]
    AlreadyStarted,

    /// The watcher has been closed
    #[error("watcher is closed")]
    Closed,

    /// Configuration value out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read
    #[error("failed to read configuration {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Configuration file is not valid TOML
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Ignore pattern or ignore file is malformed
    #[error("invalid ignore rules: {0}")]
    Ignore(#[from] ignore::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl WatchError {
    pub(crate) fn enumeration(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Enumeration {
            path: path.into(),
            source,
        }
    }

    /// True for `ref`/`unref` style rejections
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// True when an enumeration failed because the path no longer exists
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Enumeration { source, .. } | Self::Io(source) => {
                source.kind() == io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}
