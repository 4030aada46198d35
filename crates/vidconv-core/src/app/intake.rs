//! IntakeService - writes uploads to the intake directory and registers them.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::domain::{Artifact, ArtifactRole, LifecycleError};
use crate::ports::{ArtifactStore, IdGenerator};
use crate::registry::ArtifactRegistry;
use crate::storage::StoragePaths;

/// What the caller gets back for an accepted upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub artifact: Artifact,
    /// `<id>.<ext>`, the name under which the upload can be converted.
    pub file_name: String,
    /// Name the client sent, for display only.
    pub original_name: String,
    pub size: u64,
}

pub struct IntakeService {
    registry: Arc<ArtifactRegistry>,
    ids: Arc<dyn IdGenerator>,
    store: Arc<dyn ArtifactStore>,
    paths: StoragePaths,
    max_upload_bytes: u64,
}

impl IntakeService {
    pub fn new(
        registry: Arc<ArtifactRegistry>,
        ids: Arc<dyn IdGenerator>,
        store: Arc<dyn ArtifactStore>,
        paths: StoragePaths,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            registry,
            ids,
            store,
            paths,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Stream an upload to disk and register it as an Intake artifact.
    ///
    /// The extension is validated before anything touches the disk. If the
    /// body exceeds the size limit, the reader fails, or registration is
    /// refused, the partially written file is removed and nothing is
    /// registered.
    pub async fn accept<R>(
        &self,
        original_name: &str,
        reader: R,
    ) -> Result<UploadReceipt, LifecycleError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let name = self.ids.name_upload(original_name)?;
        let path = self.paths.intake_path(&name.file_name);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::AlreadyExists {
                    LifecycleError::DuplicatePath(path.clone())
                } else {
                    LifecycleError::StorageUnavailable {
                        path: path.clone(),
                        source,
                    }
                }
            })?;

        // One byte past the limit is enough to know it was exceeded.
        let mut limited = reader.take(self.max_upload_bytes.saturating_add(1));
        let written = match copy_and_flush(&mut limited, &mut file).await {
            Ok(written) => written,
            Err(err) => {
                drop(file);
                self.discard(&path).await;
                return Err(LifecycleError::Io(err));
            }
        };
        drop(file);

        if written > self.max_upload_bytes {
            self.discard(&path).await;
            debug!(original_name, limit = self.max_upload_bytes, "upload rejected: too large");
            return Err(LifecycleError::SizeLimitExceeded {
                limit: self.max_upload_bytes,
            });
        }

        let artifact = match self.registry.register(name.id, &path, ArtifactRole::Intake) {
            Ok(artifact) => artifact,
            Err(err) => {
                self.discard(&path).await;
                return Err(err);
            }
        };

        info!(
            artifact_id = %artifact.id,
            original_name,
            size = written,
            "upload accepted"
        );
        Ok(UploadReceipt {
            artifact,
            file_name: name.file_name,
            original_name: original_name.to_string(),
            size: written,
        })
    }

    async fn discard(&self, path: &Path) {
        if let Err(err) = self.store.remove(path).await {
            warn!(path = %path.display(), error = %err, "failed to remove rejected upload");
        }
    }
}

async fn copy_and_flush<R>(reader: &mut R, file: &mut tokio::fs::File) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin + Send,
{
    let written = tokio::io::copy(reader, file).await?;
    file.flush().await?;
    Ok(written)
}
