//! Errors - error types and their classification.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::ArtifactId;

/// ErrorKind groups errors by who has to act on them.
///
/// - Client: the request itself was unacceptable
/// - NotFound: the artifact is gone (expired, reaped, or never existed)
/// - External: the transcoder failed; the source is kept
/// - Internal: a bug or an environment problem on our side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Client,
    NotFound,
    External,
    Internal,
}

/// Errors surfaced by the lifecycle core.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("unsupported format {extension:?}: only .{allowed} files are accepted")]
    UnsupportedFormat {
        extension: String,
        allowed: &'static str,
    },

    #[error("upload exceeds the limit of {limit} bytes")]
    SizeLimitExceeded { limit: u64 },

    #[error("path is already tracked: {}", .0.display())]
    DuplicatePath(PathBuf),

    #[error("artifact id is already tracked: {0}")]
    DuplicateId(ArtifactId),

    #[error("storage unavailable at {}: {source}", .path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("conversion failed: {0}")]
    ConversionFailed(#[from] ConversionError),

    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::UnsupportedFormat { .. } | LifecycleError::SizeLimitExceeded { .. } => {
                ErrorKind::Client
            }
            LifecycleError::ArtifactNotFound(_) => ErrorKind::NotFound,
            LifecycleError::ConversionFailed(_) => ErrorKind::External,
            LifecycleError::DuplicatePath(_)
            | LifecycleError::DuplicateId(_)
            | LifecycleError::StorageUnavailable { .. }
            | LifecycleError::Io(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code for API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            LifecycleError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            LifecycleError::SizeLimitExceeded { .. } => "SIZE_LIMIT_EXCEEDED",
            LifecycleError::DuplicatePath(_) => "DUPLICATE_PATH",
            LifecycleError::DuplicateId(_) => "DUPLICATE_ID",
            LifecycleError::StorageUnavailable { .. } => "STORAGE_UNAVAILABLE",
            LifecycleError::ConversionFailed(_) => "CONVERSION_FAILED",
            LifecycleError::ArtifactNotFound(_) => "ARTIFACT_NOT_FOUND",
            LifecycleError::Io(_) => "IO_ERROR",
        }
    }

    pub(crate) fn not_found(id: ArtifactId) -> Self {
        LifecycleError::ArtifactNotFound(id.to_string())
    }
}

/// Failure reported by a [`Transcoder`](crate::ports::Transcoder).
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("failed to start transcoder: {0}")]
    Spawn(#[source] io::Error),

    #[error("transcoder exited with status {status}: {message}")]
    Failed { status: i32, message: String },

    #[error("transcoder timed out after {0:?}")]
    TimedOut(Duration),

    #[error("transcoder produced no output at {}", .0.display())]
    MissingOutput(PathBuf),
}
