//! Ignore pattern management for the watcher
//!
//! Supports multiple sources of ignore patterns:
//! 1. Version-control directories (.git/, .hg/, .jj/, .svn/) when enabled
//! 2. An ignore file under the watch root (gitignore syntax)
//! 3. Config-based patterns (gitignore syntax, one pattern per entry)

use crate::config::IgnoreConfig;
use crate::error::Result;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Path, PathBuf};

const VCS_DIRS: &[&str] = &[".git", ".hg", ".jj", ".svn"];

/// Ignore rule matcher bound to one watch root
///
/// Paths are matched relative to the root. The root itself is never ignored.
#[derive(Debug)]
pub struct IgnoreRules {
    /// Watch root the patterns are anchored at
    root: PathBuf,

    /// Compiled patterns (ignore file + config lines)
    matcher: Option<Gitignore>,

    /// Skip version-control directories
    ignore_vcs: bool,
}

impl IgnoreRules {
    /// Load ignore rules for `root`
    pub fn load(root: &Path, config: &IgnoreConfig) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(root);
        let mut sources = 0;

        if let Some(name) = &config.ignore_file {
            let ignore_path = root.join(name);
            if ignore_path.is_file() {
                if let Some(err) = builder.add(&ignore_path) {
                    return Err(err.into());
                }
                sources += 1;
            }
        }

        for pattern in &config.patterns {
            builder.add_line(None, pattern)?;
            sources += 1;
        }

        let matcher = if sources > 0 {
            Some(builder.build()?)
        } else {
            None
        };

        Ok(Self {
            root: root.to_path_buf(),
            matcher,
            ignore_vcs: config.ignore_vcs,
        })
    }

    /// Rules that ignore nothing
    pub fn empty(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            matcher: None,
            ignore_vcs: false,
        }
    }

    /// Check whether `path` (absolute under the root, or root-relative) is ignored
    pub fn should_ignore(&self, path: &Path, is_dir: bool) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        if relative.as_os_str().is_empty() {
            return false;
        }

        if self.ignore_vcs && is_vcs_path(relative) {
            return true;
        }

        match &self.matcher {
            Some(matcher) => matcher.matched(relative, is_dir).is_ignore(),
            None => false,
        }
    }

    /// Whether any rule can match at all
    pub fn is_empty(&self) -> bool {
        self.matcher.is_none() && !self.ignore_vcs
    }

    /// Get the watch root
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn is_vcs_path(relative: &Path) -> bool {
    relative.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .map(|name| VCS_DIRS.contains(&name))
            .unwrap_or(false)
    })
}
