//! ConversionService - runs the transcoder on an intake artifact.
//!
//! On success the output becomes a Result artifact and the intake is
//! reclaimed straight away. On failure the intake stays Active (the sweeper
//! gets it eventually) and any partial output is removed, since it was never
//! registered and nothing else would ever delete it.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::domain::{Artifact, ArtifactId, ArtifactRole, ConversionError, LifecycleError, TargetFormat};
use crate::ports::{ArtifactStore, IdGenerator, Transcoder};
use crate::registry::{ArtifactRegistry, DeleteOutcome};
use crate::storage::StoragePaths;

pub struct ConversionService {
    registry: Arc<ArtifactRegistry>,
    ids: Arc<dyn IdGenerator>,
    store: Arc<dyn ArtifactStore>,
    transcoder: Arc<dyn Transcoder>,
    paths: StoragePaths,
    timeout: Duration,
}

impl ConversionService {
    pub fn new(
        registry: Arc<ArtifactRegistry>,
        ids: Arc<dyn IdGenerator>,
        store: Arc<dyn ArtifactStore>,
        transcoder: Arc<dyn Transcoder>,
        paths: StoragePaths,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            ids,
            store,
            transcoder,
            paths,
            timeout,
        }
    }

    /// Convert an Active intake artifact and return the new Result artifact.
    ///
    /// # Errors
    /// - `ArtifactNotFound` if `intake_id` is not an Active intake
    /// - `ConversionFailed` if the transcoder fails, times out or writes nothing
    pub async fn convert(
        &self,
        intake_id: ArtifactId,
        format: TargetFormat,
    ) -> Result<Artifact, LifecycleError> {
        let intake = self
            .registry
            .get_active(intake_id, Some(ArtifactRole::Intake))
            .ok_or_else(|| LifecycleError::not_found(intake_id))?;

        let result_id = self.ids.generate_artifact_id();
        let output = self.paths.result_path(result_id, format);
        debug!(
            artifact_id = %intake_id,
            %format,
            output = %output.display(),
            "conversion started"
        );
        let started = Instant::now();

        if let Err(err) = self.run_transcoder(&intake.path, &output, format).await {
            error!(artifact_id = %intake_id, %format, error = %err, "conversion failed");
            self.discard(&output).await;
            return Err(LifecycleError::ConversionFailed(err));
        }

        let result = match self.registry.register_result(result_id, &output, intake_id) {
            Ok(result) => result,
            Err(err) => {
                self.discard(&output).await;
                return Err(err);
            }
        };

        // Failed removals are logged by the registry and retried by the sweeper.
        if self.registry.reclaim(intake_id).await == DeleteOutcome::Skipped {
            debug!(artifact_id = %intake_id, "intake already reclaimed by another trigger");
        }

        info!(
            artifact_id = %result.id,
            derived_from = %intake_id,
            %format,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "conversion finished"
        );
        Ok(result)
    }

    async fn run_transcoder(
        &self,
        input: &Path,
        output: &Path,
        format: TargetFormat,
    ) -> Result<(), ConversionError> {
        tokio::time::timeout(self.timeout, self.transcoder.convert(input, output, format))
            .await
            .map_err(|_| ConversionError::TimedOut(self.timeout))??;

        match tokio::fs::metadata(output).await {
            Ok(metadata) if metadata.is_file() => Ok(()),
            _ => Err(ConversionError::MissingOutput(output.to_path_buf())),
        }
    }

    async fn discard(&self, output: &Path) {
        if let Err(err) = self.store.remove(output).await {
            warn!(path = %output.display(), error = %err, "failed to remove partial conversion output");
        }
    }
}
