//! In-memory artifact registry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info, warn};

use super::{ArtifactRecord, DeleteOutcome};
use crate::app::status::RegistryCounts;
use crate::domain::{Artifact, ArtifactId, ArtifactRole, ArtifactState, LifecycleError};
use crate::ports::{ArtifactStore, Clock, IdGenerator, RemoveOutcome};
use crate::storage::StoragePaths;

/// Registry of every file the service has put on disk.
///
/// Design:
/// - This is the single source of truth for "what may still be deleted".
/// - Both maps are sharded (`DashMap`), so lookups from request tasks never
///   wait on a global lock.
/// - The only synchronization that matters for correctness is the per-record
///   compare-exchange in [`mark_pending_deletion`](Self::mark_pending_deletion).
/// - No map guard is ever held across an `.await`.
pub struct ArtifactRegistry {
    records: DashMap<ArtifactId, Arc<ArtifactRecord>>,
    paths: DashMap<PathBuf, ArtifactId>,
    store: Arc<dyn ArtifactStore>,
    clock: Arc<dyn Clock>,
}

impl ArtifactRegistry {
    pub fn new(store: Arc<dyn ArtifactStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: DashMap::new(),
            paths: DashMap::new(),
            store,
            clock,
        }
    }

    /// Track a new file as Active, timestamped with the registry clock.
    ///
    /// Fails with `DuplicatePath` if another live artifact already owns
    /// `path`.
    pub fn register(
        &self,
        id: ArtifactId,
        path: impl Into<PathBuf>,
        role: ArtifactRole,
    ) -> Result<Artifact, LifecycleError> {
        let record = ArtifactRecord::new(id, path.into(), role, self.clock.now(), None);
        self.insert(record)
    }

    /// Track a conversion output, remembering which intake it came from.
    pub fn register_result(
        &self,
        id: ArtifactId,
        path: impl Into<PathBuf>,
        derived_from: ArtifactId,
    ) -> Result<Artifact, LifecycleError> {
        let record = ArtifactRecord::new(
            id,
            path.into(),
            ArtifactRole::Result,
            self.clock.now(),
            Some(derived_from),
        );
        self.insert(record)
    }

    fn insert(&self, record: ArtifactRecord) -> Result<Artifact, LifecycleError> {
        match self.paths.entry(record.path.clone()) {
            Entry::Occupied(_) => return Err(LifecycleError::DuplicatePath(record.path)),
            Entry::Vacant(slot) => {
                slot.insert(record.id);
            }
        }

        match self.records.entry(record.id) {
            Entry::Occupied(_) => {
                self.paths.remove_if(&record.path, |_, owner| *owner == record.id);
                Err(LifecycleError::DuplicateId(record.id))
            }
            Entry::Vacant(slot) => {
                let snapshot = record.snapshot();
                slot.insert(Arc::new(record));
                debug!(
                    artifact_id = %snapshot.id,
                    role = %snapshot.role,
                    path = %snapshot.path.display(),
                    "artifact registered"
                );
                Ok(snapshot)
            }
        }
    }

    fn record(&self, id: ArtifactId) -> Option<Arc<ArtifactRecord>> {
        self.records.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn get(&self, id: ArtifactId) -> Option<Artifact> {
        self.record(id).map(|record| record.snapshot())
    }

    /// The artifact, if it is still Active (and has the given role).
    ///
    /// Anything PendingDeletion is reported as gone.
    pub fn get_active(&self, id: ArtifactId, role: Option<ArtifactRole>) -> Option<Artifact> {
        self.record(id)
            .filter(|record| record.state().is_active())
            .filter(|record| role.is_none_or(|role| record.role == role))
            .map(|record| record.snapshot())
    }

    /// Id of the live artifact stored at `path`, if any.
    pub fn id_for_path(&self, path: &Path) -> Option<ArtifactId> {
        self.paths.get(path).map(|entry| *entry.value())
    }

    /// Active -> PendingDeletion.
    ///
    /// Returns `false` (not an error) when the id is unknown or the artifact
    /// is already on its way out. Of several concurrent callers for the same
    /// id exactly one sees `true`.
    pub fn mark_pending_deletion(&self, id: ArtifactId) -> bool {
        let Some(record) = self.record(id) else {
            return false;
        };
        let flipped = record.begin_deletion();
        if flipped {
            debug!(artifact_id = %id, "artifact marked for deletion");
        }
        flipped
    }

    /// Physically remove a PendingDeletion artifact, at most once.
    ///
    /// The first caller to claim the record performs the removal; every other
    /// caller gets `Skipped`. A file that is already missing counts as
    /// success. A failed removal leaves the record PendingDeletion so the
    /// sweeper can retry it later.
    pub async fn delete(&self, id: ArtifactId) -> DeleteOutcome {
        let Some(record) = self.record(id) else {
            return DeleteOutcome::Skipped;
        };
        if !record.claim_unlink() {
            return DeleteOutcome::Skipped;
        }

        match self.store.remove(&record.path).await {
            Ok(removed) => {
                record.finish_deletion();
                self.forget(&record);
                match removed {
                    RemoveOutcome::Removed => {
                        info!(
                            artifact_id = %id,
                            role = %record.role,
                            path = %record.path.display(),
                            "artifact deleted"
                        );
                        DeleteOutcome::Removed
                    }
                    RemoveOutcome::AlreadyAbsent => {
                        debug!(
                            artifact_id = %id,
                            path = %record.path.display(),
                            "artifact file was already gone"
                        );
                        DeleteOutcome::AlreadyAbsent
                    }
                }
            }
            Err(err) => {
                record.release_unlink();
                warn!(
                    artifact_id = %id,
                    path = %record.path.display(),
                    error = %err,
                    "failed to delete artifact file; will retry on a later sweep"
                );
                DeleteOutcome::Failed
            }
        }
    }

    /// `mark_pending_deletion` followed by `delete`.
    ///
    /// This is what every cleanup trigger (sweeper, reaper, conversion,
    /// admin) calls. An artifact whose earlier removal failed is retried
    /// here as well. Losing the race to another trigger is `Skipped`.
    pub async fn reclaim(&self, id: ArtifactId) -> DeleteOutcome {
        if self.mark_pending_deletion(id) {
            return self.delete(id).await;
        }
        match self.record(id) {
            Some(record) if record.is_stalled() => self.delete(id).await,
            _ => DeleteOutcome::Skipped,
        }
    }

    fn forget(&self, record: &ArtifactRecord) {
        self.records.remove(&record.id);
        self.paths
            .remove_if(&record.path, |_, owner| *owner == record.id);
    }

    /// Active artifacts created strictly before `cutoff`, oldest first.
    ///
    /// The candidate set is captured now; each item is re-checked when the
    /// iterator reaches it, so artifacts reclaimed in the meantime are
    /// skipped. Call again for a fresh view.
    pub fn list_older_than(
        &self,
        cutoff: DateTime<Utc>,
        role: Option<ArtifactRole>,
    ) -> OverdueArtifacts {
        let mut candidates: Vec<Arc<ArtifactRecord>> = self
            .records
            .iter()
            .filter(|entry| entry.created_at < cutoff)
            .filter(|entry| role.is_none_or(|role| entry.role == role))
            .filter(|entry| entry.state().is_active())
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        candidates.sort_by_key(|record| (record.created_at, record.id));

        OverdueArtifacts {
            inner: candidates.into_iter(),
        }
    }

    /// Artifacts older than `cutoff` whose removal failed and that nobody is
    /// currently retrying (permissions, busy file). The sweeper retries them.
    ///
    /// Records merely flipped to PendingDeletion by another task are left to
    /// that task.
    pub fn list_stalled(&self, cutoff: DateTime<Utc>) -> Vec<ArtifactId> {
        self.records
            .iter()
            .filter(|entry| entry.created_at < cutoff)
            .filter(|entry| entry.is_stalled())
            .map(|entry| entry.id)
            .collect()
    }

    pub fn counts(&self) -> RegistryCounts {
        let mut counts = RegistryCounts::default();
        for entry in self.records.iter() {
            match (entry.state(), entry.role) {
                (ArtifactState::Active, ArtifactRole::Intake) => counts.intake += 1,
                (ArtifactState::Active, ArtifactRole::Result) => counts.result += 1,
                (ArtifactState::PendingDeletion, _) => counts.pending_deletion += 1,
                (ArtifactState::Deleted, _) => {}
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Re-register files left on disk by a previous process.
    ///
    /// Each regular file in the two directories becomes an Active artifact
    /// whose creation time is its on-disk mtime, so the sweeper reclaims
    /// orphans on its normal schedule. Files whose stem is not an artifact
    /// id are given a fresh id. Returns how many files were restored.
    pub async fn rebuild_from_disk(
        &self,
        paths: &StoragePaths,
        ids: &dyn IdGenerator,
    ) -> Result<usize, LifecycleError> {
        let mut restored = 0;
        for role in [ArtifactRole::Intake, ArtifactRole::Result] {
            let dir = paths.dir_for(role);
            let files = self
                .store
                .list(dir)
                .await
                .map_err(|source| LifecycleError::StorageUnavailable {
                    path: dir.to_path_buf(),
                    source,
                })?;

            for file in files {
                let id = file
                    .path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .and_then(ArtifactId::from_file_name)
                    .unwrap_or_else(|| ids.generate_artifact_id());
                let record =
                    ArtifactRecord::new(id, file.path.clone(), role, file.modified_at, None);
                let inserted = match self.insert(record) {
                    // Same stem, different extension: still needs an entry.
                    Err(LifecycleError::DuplicateId(_)) => self.insert(ArtifactRecord::new(
                        ids.generate_artifact_id(),
                        file.path,
                        role,
                        file.modified_at,
                        None,
                    )),
                    other => other,
                };
                match inserted {
                    Ok(_) => restored += 1,
                    // Already tracked under this path.
                    Err(err) => debug!(error = %err, "skipping file during registry rebuild"),
                }
            }
        }

        if restored > 0 {
            info!(restored, "registry rebuilt from files left on disk");
        }
        Ok(restored)
    }
}

/// Iterator returned by [`ArtifactRegistry::list_older_than`].
pub struct OverdueArtifacts {
    inner: std::vec::IntoIter<Arc<ArtifactRecord>>,
}

impl Iterator for OverdueArtifacts {
    type Item = Artifact;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = self.inner.next()?;
            if record.state().is_active() {
                return Some(record.snapshot());
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.inner.len()))
    }
}
