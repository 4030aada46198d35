//! Artifact record: metadata + live state.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};

use super::state::AtomicArtifactState;
use crate::domain::{Artifact, ArtifactId, ArtifactRole, ArtifactState};

/// Registry entry for one file on disk.
///
/// Design:
/// - Everything except the state is immutable after registration.
/// - State changes go through compare-exchange, never through a lock.
/// - `unlinking` marks the single task currently allowed to remove the file.
/// - `failed` marks a removal that was attempted and failed; only such
///   records may be picked up by someone other than the task that flipped
///   the state.
#[derive(Debug)]
pub struct ArtifactRecord {
    pub id: ArtifactId,
    pub path: PathBuf,
    pub role: ArtifactRole,
    pub created_at: DateTime<Utc>,
    pub derived_from: Option<ArtifactId>,

    state: AtomicArtifactState,
    unlinking: AtomicBool,
    failed: AtomicBool,
}

impl ArtifactRecord {
    pub fn new(
        id: ArtifactId,
        path: PathBuf,
        role: ArtifactRole,
        created_at: DateTime<Utc>,
        derived_from: Option<ArtifactId>,
    ) -> Self {
        Self {
            id,
            path,
            role,
            created_at,
            derived_from,
            state: AtomicArtifactState::new(ArtifactState::Active),
            unlinking: AtomicBool::new(false),
            failed: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> ArtifactState {
        self.state.load()
    }

    pub fn snapshot(&self) -> Artifact {
        Artifact {
            id: self.id,
            path: self.path.clone(),
            role: self.role,
            created_at: self.created_at,
            state: self.state(),
            derived_from: self.derived_from,
        }
    }

    /// Active -> PendingDeletion. `true` only for the caller that flipped it.
    pub(crate) fn begin_deletion(&self) -> bool {
        self.state
            .transition(ArtifactState::Active, ArtifactState::PendingDeletion)
    }

    /// Take the right to unlink the file.
    ///
    /// Succeeds only while the record is PendingDeletion and nobody else
    /// holds the claim.
    pub(crate) fn claim_unlink(&self) -> bool {
        self.state() == ArtifactState::PendingDeletion
            && !self.unlinking.swap(true, Ordering::AcqRel)
    }

    /// Give the claim back after a failed removal so a retry can take it.
    pub(crate) fn release_unlink(&self) {
        self.failed.store(true, Ordering::Release);
        self.unlinking.store(false, Ordering::Release);
    }

    /// PendingDeletion after a failed removal, with nobody retrying it.
    pub(crate) fn is_stalled(&self) -> bool {
        self.state() == ArtifactState::PendingDeletion
            && self.failed.load(Ordering::Acquire)
            && !self.unlinking.load(Ordering::Acquire)
    }

    /// PendingDeletion -> Deleted.
    pub(crate) fn finish_deletion(&self) -> bool {
        self.state
            .transition(ArtifactState::PendingDeletion, ArtifactState::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn record() -> ArtifactRecord {
        ArtifactRecord::new(
            ArtifactId::from_ulid(Ulid::new()),
            PathBuf::from("/tmp/uploads/a.ts"),
            ArtifactRole::Intake,
            Utc::now(),
            None,
        )
    }

    #[test]
    fn new_record_is_active() {
        let record = record();
        assert_eq!(record.state(), ArtifactState::Active);
        assert_eq!(record.snapshot().state, ArtifactState::Active);
    }

    #[test]
    fn unlink_cannot_be_claimed_while_active() {
        let record = record();
        assert!(!record.claim_unlink());
    }

    #[test]
    fn unlink_claim_is_exclusive_until_released() {
        let record = record();
        assert!(record.begin_deletion());

        assert!(record.claim_unlink());
        assert!(!record.claim_unlink());

        record.release_unlink();
        assert!(record.claim_unlink());
    }

    #[test]
    fn only_failed_removals_are_stalled() {
        let record = record();
        assert!(record.begin_deletion());
        // Flipped but not yet claimed by its owner.
        assert!(!record.is_stalled());

        assert!(record.claim_unlink());
        assert!(!record.is_stalled());

        record.release_unlink();
        assert!(record.is_stalled());

        assert!(record.claim_unlink());
        assert!(!record.is_stalled());
    }

    #[test]
    fn lifecycle_is_monotonic() {
        let record = record();

        assert!(!record.finish_deletion());
        assert!(record.begin_deletion());
        assert!(!record.begin_deletion());
        assert!(record.finish_deletion());
        assert!(!record.finish_deletion());
        assert_eq!(record.state(), ArtifactState::Deleted);
        assert!(!record.claim_unlink());
    }
}
