//! ArtifactStore port - the filesystem underneath the registry.
//!
//! The registry decides *whether* a file may be removed; the store does the
//! physical I/O. Keeping the I/O behind a trait lets tests count removal
//! attempts and inject failures.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Result of a physical removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// Nothing was there. Benign: the filesystem has no transactions and
    /// somebody (or something) got there first.
    AlreadyAbsent,
}

/// A regular file found while scanning a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub modified_at: DateTime<Utc>,
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Remove one file. A missing file is `Ok(AlreadyAbsent)`, never an error.
    async fn remove(&self, path: &Path) -> io::Result<RemoveOutcome>;

    /// List the regular files directly inside `dir`, with their mtime.
    async fn list(&self, dir: &Path) -> io::Result<Vec<StoredFile>>;
}
