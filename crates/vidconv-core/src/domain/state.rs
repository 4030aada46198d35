//! Artifact lifecycle state.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a tracked artifact.
///
/// State transitions (monotonic, never backwards):
/// - Active -> PendingDeletion -> Deleted
///
/// Whoever flips Active -> PendingDeletion owns the right to unlink the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactState {
    /// On disk and available to readers.
    Active,

    /// Claimed for deletion; readers must treat it as gone.
    PendingDeletion,

    /// File removed (or found already absent).
    Deleted,
}

impl ArtifactState {
    pub fn is_active(self) -> bool {
        matches!(self, ArtifactState::Active)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ArtifactState::Deleted)
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            ArtifactState::Active => 0,
            ArtifactState::PendingDeletion => 1,
            ArtifactState::Deleted => 2,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => ArtifactState::Active,
            1 => ArtifactState::PendingDeletion,
            _ => ArtifactState::Deleted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::active(ArtifactState::Active)]
    #[case::pending(ArtifactState::PendingDeletion)]
    #[case::deleted(ArtifactState::Deleted)]
    fn u8_encoding_is_lossless(#[case] state: ArtifactState) {
        assert_eq!(ArtifactState::from_u8(state.as_u8()), state);
    }

    #[test]
    fn only_deleted_is_terminal() {
        assert!(!ArtifactState::Active.is_terminal());
        assert!(!ArtifactState::PendingDeletion.is_terminal());
        assert!(ArtifactState::Deleted.is_terminal());
    }
}
