//! LocalArtifactStore - the real filesystem.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::ports::{ArtifactStore, RemoveOutcome, StoredFile};

/// ArtifactStore backed by `tokio::fs`.
///
/// All calls run on tokio's blocking pool, off the request path.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalArtifactStore;

impl LocalArtifactStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn remove(&self, path: &Path) -> io::Result<RemoveOutcome> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(RemoveOutcome::Removed),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(RemoveOutcome::AlreadyAbsent),
            Err(err) => Err(err),
        }
    }

    /// Hidden entries (leading `.`), directories and symlinks are skipped.
    async fn list(&self, dir: &Path) -> io::Result<Vec<StoredFile>> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                // Removed between read_dir and stat.
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err),
            };
            if !metadata.is_file() {
                continue;
            }
            let modified_at = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            files.push(StoredFile {
                path: entry.path(),
                modified_at,
            });
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}
