//! Artifact model: a single tracked file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ArtifactId, ArtifactState};

/// Which directory an artifact lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactRole {
    /// Uploaded source waiting for conversion.
    Intake,
    /// Output produced by the transcoder.
    Result,
}

impl ArtifactRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactRole::Intake => "intake",
            ArtifactRole::Result => "result",
        }
    }
}

impl std::fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a registry entry.
///
/// The registry owns the live record; this is a copy and does not follow
/// later state changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub path: PathBuf,
    pub role: ArtifactRole,
    pub created_at: DateTime<Utc>,
    pub state: ArtifactState,

    /// For results: the intake artifact this file was converted from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_from: Option<ArtifactId>,
}

impl Artifact {
    /// File name component of `path` (what clients see in URLs).
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
