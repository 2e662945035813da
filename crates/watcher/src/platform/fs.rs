//! Tokio-backed directory lister and stat-er

use super::{DirEntryInfo, FsProbe};
use crate::metadata::MetadataRecord;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

/// [`FsProbe`] over `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFsProbe;

impl TokioFsProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FsProbe for TokioFsProbe {
    async fn list(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut reader = tokio::fs::read_dir(dir).await?;
        let mut entries = Vec::new();

        while let Some(entry) = reader.next_entry().await? {
            // file_type() does not follow symlinks
            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };

            entries.push(DirEntryInfo {
                name: entry.file_name(),
                is_directory: file_type.is_dir(),
                is_symlink: file_type.is_symlink(),
            });
        }

        Ok(entries)
    }

    async fn stat(&self, path: &Path) -> io::Result<MetadataRecord> {
        let md = tokio::fs::metadata(path).await?;
        Ok(MetadataRecord::from_metadata(&md))
    }

    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        tokio::fs::canonicalize(path).await
    }
}
