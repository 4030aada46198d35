//! LifecycleBuilder - wiring of the lifecycle components.
//!
//! # Fail-fast
//! `build()` rejects schedules that could never reclaim anything (zero
//! interval or retention) and a reap grace that outlives the retention
//! window, before any task is spawned.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use super::conversion::ConversionService;
use super::intake::IntakeService;
use super::reaper::PostConsumptionReaper;
use super::status::RegistryCounts;
use super::sweeper::ExpirySweeper;
use crate::config::LifecycleConfig;
use crate::domain::LifecycleError;
use crate::impls::LocalArtifactStore;
use crate::ports::{ArtifactStore, Clock, IdGenerator, SystemClock, Transcoder, UlidGenerator};
use crate::registry::ArtifactRegistry;
use crate::storage::StoragePaths;

/// Builds a [`Lifecycle`].
///
/// # Example
/// ```ignore
/// let paths = StoragePaths::ensure(&config.intake_dir, &config.results_dir).await?;
/// let lifecycle = LifecycleBuilder::new(config)
///     .with_transcoder(Arc::new(FfmpegTranscoder::new("ffmpeg")))
///     .build(paths)?;
/// lifecycle.start().await?;
/// ```
pub struct LifecycleBuilder {
    config: LifecycleConfig,
    clock: Option<Arc<dyn Clock>>,
    store: Option<Arc<dyn ArtifactStore>>,
    ids: Option<Arc<dyn IdGenerator>>,
    transcoder: Option<Arc<dyn Transcoder>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no transcoder configured")]
    MissingTranscoder,
    #[error("invalid schedule: {0}")]
    InvalidSchedule(&'static str),
}

impl LifecycleBuilder {
    pub fn new(config: LifecycleConfig) -> Self {
        Self {
            config,
            clock: None,
            store: None,
            ids: None,
            transcoder: None,
        }
    }

    /// Defaults to [`SystemClock`].
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Defaults to [`LocalArtifactStore`].
    pub fn with_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Defaults to a [`UlidGenerator`] on the builder's clock.
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Required.
    pub fn with_transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = Some(transcoder);
        self
    }

    pub fn build(self, paths: StoragePaths) -> Result<Lifecycle, BuildError> {
        let config = self.config;
        if config.sweep_interval_secs == 0 {
            return Err(BuildError::InvalidSchedule("sweep interval must be positive"));
        }
        if config.retention_secs == 0 {
            return Err(BuildError::InvalidSchedule("retention window must be positive"));
        }
        if config.reap_grace_secs >= config.retention_secs {
            return Err(BuildError::InvalidSchedule(
                "reap grace delay must be shorter than the retention window",
            ));
        }
        let transcoder = self.transcoder.ok_or(BuildError::MissingTranscoder)?;

        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let store: Arc<dyn ArtifactStore> = match self.store {
            Some(store) => store,
            None => Arc::new(LocalArtifactStore::new()),
        };
        let ids: Arc<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Arc::new(UlidGenerator::new(Arc::clone(&clock))),
        };

        let registry = Arc::new(ArtifactRegistry::new(Arc::clone(&store), Arc::clone(&clock)));
        let token = CancellationToken::new();
        let tracker = TaskTracker::new();

        let intake = IntakeService::new(
            Arc::clone(&registry),
            Arc::clone(&ids),
            Arc::clone(&store),
            paths.clone(),
            config.max_upload_bytes,
        );
        let conversion = ConversionService::new(
            Arc::clone(&registry),
            Arc::clone(&ids),
            store,
            transcoder,
            paths.clone(),
            config.conversion_timeout(),
        );
        let reaper = PostConsumptionReaper::new(
            Arc::clone(&registry),
            config.reap_grace(),
            token.clone(),
            tracker.clone(),
        );
        let sweeper = Arc::new(ExpirySweeper::new(
            Arc::clone(&registry),
            clock,
            config.sweep_interval(),
            config.retention_window(),
        ));

        Ok(Lifecycle {
            config,
            paths,
            registry,
            ids,
            intake,
            conversion,
            reaper,
            sweeper,
            token,
            tracker,
            started: AtomicBool::new(false),
        })
    }
}

/// The running lifecycle: registry, request-path services and background
/// tasks sharing one cancellation token.
pub struct Lifecycle {
    config: LifecycleConfig,
    paths: StoragePaths,
    registry: Arc<ArtifactRegistry>,
    ids: Arc<dyn IdGenerator>,
    intake: IntakeService,
    conversion: ConversionService,
    reaper: PostConsumptionReaper,
    sweeper: Arc<ExpirySweeper>,
    token: CancellationToken,
    tracker: TaskTracker,
    started: AtomicBool,
}

impl Lifecycle {
    /// Restore files left on disk, then start the sweeper.
    ///
    /// Returns how many artifacts were restored. Calling it again is a no-op.
    pub async fn start(&self) -> Result<usize, LifecycleError> {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("lifecycle already started");
            return Ok(0);
        }

        let restored = self
            .registry
            .rebuild_from_disk(&self.paths, self.ids.as_ref())
            .await?;
        Arc::clone(&self.sweeper).spawn(self.token.clone(), &self.tracker);
        info!(restored, "artifact lifecycle started");
        Ok(restored)
    }

    /// Cancel background work and wait for in-flight deletions to finish.
    pub async fn shutdown(&self) {
        self.token.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!(remaining = self.registry.len(), "artifact lifecycle stopped");
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    pub fn registry(&self) -> &Arc<ArtifactRegistry> {
        &self.registry
    }

    pub fn intake(&self) -> &IntakeService {
        &self.intake
    }

    pub fn conversion(&self) -> &ConversionService {
        &self.conversion
    }

    pub fn reaper(&self) -> &PostConsumptionReaper {
        &self.reaper
    }

    pub fn counts(&self) -> RegistryCounts {
        self.registry.counts()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }
}
