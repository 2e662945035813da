//! Recursive polling file watcher
//!
//! This crate watches a directory tree by periodically stat-ing every path
//! in it:
//! - One poller per watched path, at a configurable interval
//! - Directory rescans that reconcile the watch set with disk
//! - Cascading removal of vanished subtrees
//! - Push handlers and a pull-style change reader
//!
//! ```no_run
//! # async fn demo() -> pollwatch::Result<()> {
//! let watcher = pollwatch::watch("./src", pollwatch::WatcherConfig::default()).await?;
//! watcher.on_change(|event| println!("{} {}", event.kind, event.path.display()));
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod config;
pub mod diagnostics;
pub mod enumerate;
pub mod error;
pub mod event;
pub mod ignore;
pub mod metadata;
pub mod platform;
pub mod poller;
pub mod watch_set;
pub mod watcher;

mod manager;

#[cfg(test)]
mod test_support;

pub use config::{IgnoreConfig, WatcherConfig, DEFAULT_POLL_INTERVAL_MS};
pub use diagnostics::WatcherDiagnostics;
pub use error::{Result, WatchError};
pub use event::{ChangeEvent, ChangeKind, Changes, HandlerId, PullItem, WatcherEvent};
pub use metadata::MetadataRecord;
pub use platform::{DirEntryInfo, FsProbe, IntervalPoller, StatPoller, TickFn, TokioFsProbe};
pub use watcher::{watch, PollWatcher};
