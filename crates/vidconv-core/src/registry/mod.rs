//! Artifact registry: live records, atomic state transitions, and the
//! at-most-once delete protocol.

mod memory;
mod record;
mod state;

pub use memory::{ArtifactRegistry, OverdueArtifacts};
pub use record::ArtifactRecord;

/// What a delete attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// This caller removed the file.
    Removed,
    /// This caller owned the removal but the file was already gone.
    AlreadyAbsent,
    /// Another caller owns (or completed) the removal, or the id is unknown.
    Skipped,
    /// Removal failed; the artifact stays PendingDeletion for a later retry.
    Failed,
}

impl DeleteOutcome {
    /// Whether this call finished the artifact off.
    pub fn is_reclaimed(self) -> bool {
        matches!(self, DeleteOutcome::Removed | DeleteOutcome::AlreadyAbsent)
    }
}
