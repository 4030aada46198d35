//! Storage paths: the intake and results directories.

use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::{ArtifactId, ArtifactRole, LifecycleError, TargetFormat};

/// The two well-known directories, resolved to absolute paths.
///
/// Only obtainable through [`StoragePaths::ensure`], so holding one means
/// both directories existed and were writable at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    intake_dir: PathBuf,
    results_dir: PathBuf,
}

impl StoragePaths {
    /// Create both directories if missing and check they accept writes.
    ///
    /// Idempotent. Any failure (permissions, full disk, read-only
    /// filesystem, a file in the way) is `StorageUnavailable`, and the
    /// caller must not start accepting uploads.
    pub async fn ensure(
        intake_dir: impl AsRef<Path>,
        results_dir: impl AsRef<Path>,
    ) -> Result<Self, LifecycleError> {
        let intake_dir = ensure_dir(intake_dir.as_ref()).await?;
        let results_dir = ensure_dir(results_dir.as_ref()).await?;

        info!(
            intake_dir = %intake_dir.display(),
            results_dir = %results_dir.display(),
            "storage directories ready"
        );

        Ok(Self {
            intake_dir,
            results_dir,
        })
    }

    pub fn intake_dir(&self) -> &Path {
        &self.intake_dir
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn dir_for(&self, role: ArtifactRole) -> &Path {
        match role {
            ArtifactRole::Intake => &self.intake_dir,
            ArtifactRole::Result => &self.results_dir,
        }
    }

    pub fn intake_path(&self, file_name: &str) -> PathBuf {
        self.intake_dir.join(file_name)
    }

    /// `<results>/<id>.<format extension>`
    pub fn result_path(&self, id: ArtifactId, format: TargetFormat) -> PathBuf {
        self.results_dir
            .join(format!("{id}.{}", format.extension()))
    }
}

async fn ensure_dir(dir: &Path) -> Result<PathBuf, LifecycleError> {
    let unavailable = |path: &Path, source: io::Error| LifecycleError::StorageUnavailable {
        path: path.to_path_buf(),
        source,
    };

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| unavailable(dir, e))?;
    let absolute = tokio::fs::canonicalize(dir)
        .await
        .map_err(|e| unavailable(dir, e))?;
    probe_writable(&absolute)
        .await
        .map_err(|e| unavailable(&absolute, e))?;

    Ok(absolute)
}

// create_dir_all succeeds on a read-only mount when the directory already
// exists, so write something to find out.
async fn probe_writable(dir: &Path) -> io::Result<()> {
    let probe = dir.join(format!(".vidconv-probe-{}", std::process::id()));
    tokio::fs::write(&probe, b"").await?;
    tokio::fs::remove_file(&probe).await
}
