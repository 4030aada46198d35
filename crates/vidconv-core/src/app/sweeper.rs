//! ExpirySweeper - periodic, age-based reclamation.
//!
//! The backstop for everything the request path forgets: uploads that were
//! never converted, results that were never downloaded, reaps abandoned at
//! shutdown, and files left over from a previous process.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

use crate::ports::Clock;
use crate::registry::{ArtifactRegistry, DeleteOutcome};

/// Tally of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub removed: usize,
    pub already_absent: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SweepReport {
    fn record(&mut self, outcome: DeleteOutcome) {
        self.examined += 1;
        match outcome {
            DeleteOutcome::Removed => self.removed += 1,
            DeleteOutcome::AlreadyAbsent => self.already_absent += 1,
            DeleteOutcome::Skipped => self.skipped += 1,
            DeleteOutcome::Failed => self.failed += 1,
        }
    }

    pub fn reclaimed(&self) -> usize {
        self.removed + self.already_absent
    }
}

pub struct ExpirySweeper {
    registry: Arc<ArtifactRegistry>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    retention: Duration,
}

impl ExpirySweeper {
    pub fn new(
        registry: Arc<ArtifactRegistry>,
        clock: Arc<dyn Clock>,
        interval: Duration,
        retention: Duration,
    ) -> Self {
        Self {
            registry,
            clock,
            interval,
            retention,
        }
    }

    /// `now - retention`. Artifacts created strictly before this are overdue.
    pub fn cutoff(&self) -> DateTime<Utc> {
        let retention = chrono::Duration::from_std(self.retention).unwrap_or(chrono::Duration::MAX);
        self.clock
            .now()
            .checked_sub_signed(retention)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// One pass over every overdue artifact.
    ///
    /// Per-artifact failures are counted and logged, never returned; the pass
    /// always visits the whole snapshot. Deletions that failed on an earlier
    /// attempt (left PendingDeletion) are retried first.
    pub async fn run_once(&self) -> SweepReport {
        let cutoff = self.cutoff();
        let mut report = SweepReport::default();

        for id in self.registry.list_stalled(self.clock.now()) {
            report.record(self.registry.delete(id).await);
        }
        for artifact in self.registry.list_older_than(cutoff, None) {
            report.record(self.registry.reclaim(artifact.id).await);
        }

        if report.failed > 0 {
            error!(
                failed = report.failed,
                reclaimed = report.reclaimed(),
                "sweep finished with failures"
            );
        } else if report.examined > 0 {
            info!(
                reclaimed = report.reclaimed(),
                skipped = report.skipped,
                %cutoff,
                "sweep finished"
            );
        } else {
            debug!(%cutoff, "sweep found nothing overdue");
        }
        report
    }

    /// Run [`run_once`](Self::run_once) every interval until `token` is
    /// cancelled. The first pass runs immediately.
    pub fn spawn(self: Arc<Self>, token: CancellationToken, tracker: &TaskTracker) -> JoinHandle<()> {
        tracker.spawn(async move {
            let mut ticker = interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                interval_secs = self.interval.as_secs(),
                retention_secs = self.retention.as_secs(),
                "expiry sweeper started"
            );

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!("expiry sweeper shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.run_once().await;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingStore, Fixture};

    const RETENTION: Duration = Duration::from_secs(30 * 60);

    fn sweeper(fx: &Fixture) -> ExpirySweeper {
        ExpirySweeper::new(
            Arc::clone(&fx.registry),
            Arc::clone(&fx.clock) as Arc<dyn Clock>,
            Duration::from_secs(15 * 60),
            RETENTION,
        )
    }

    #[tokio::test]
    async fn unconverted_upload_is_gone_after_31_minutes() {
        let fx = Fixture::new().await;
        let intake = fx.registered_intake(b"ts").await;

        fx.clock.advance(Duration::from_secs(31 * 60));
        let report = sweeper(&fx).run_once().await;

        assert_eq!(report.removed, 1);
        assert!(fx.registry.is_empty());
        assert_eq!(fx.registry.list_older_than(fx.clock.now(), None).count(), 0);
        assert!(!intake.path.exists());
    }

    #[tokio::test]
    async fn young_artifacts_survive_the_sweep() {
        let fx = Fixture::new().await;
        let old = fx.registered_result(b"old").await;
        fx.clock.advance(Duration::from_secs(20 * 60));
        let young = fx.registered_intake(b"young").await;
        fx.clock.advance(Duration::from_secs(11 * 60));

        let report = sweeper(&fx).run_once().await;

        assert_eq!(report.examined, 1);
        assert_eq!(fx.registry.get(old.id), None);
        assert_eq!(fx.registry.get_active(young.id, None), Some(young.clone()));
        assert!(young.path.exists());
    }

    #[tokio::test]
    async fn artifact_exactly_at_the_cutoff_is_kept() {
        let fx = Fixture::new().await;
        let intake = fx.registered_intake(b"ts").await;

        fx.clock.advance(RETENTION);
        let report = sweeper(&fx).run_once().await;

        assert_eq!(report, SweepReport::default());
        assert!(fx.registry.get_active(intake.id, None).is_some());
    }

    #[tokio::test]
    async fn missing_file_counts_as_reclaimed() {
        let fx = Fixture::new().await;
        let intake = fx.registered_intake(b"ts").await;
        tokio::fs::remove_file(&intake.path).await.unwrap();

        fx.clock.advance(Duration::from_secs(31 * 60));
        let report = sweeper(&fx).run_once().await;

        assert_eq!(report.already_absent, 1);
        assert!(fx.registry.is_empty());
    }

    #[tokio::test]
    async fn sweep_leaves_a_deletion_owned_by_another_task_alone() {
        let fx = Fixture::new().await;
        let intake = fx.registered_intake(b"ts").await;
        assert!(fx.registry.mark_pending_deletion(intake.id));
        fx.clock.advance(Duration::from_secs(31 * 60));

        let report = sweeper(&fx).run_once().await;

        assert_eq!(report, SweepReport::default());
        assert_eq!(fx.store.remove_calls(), 0);
        assert!(intake.path.exists());
    }

    #[tokio::test]
    async fn failure_does_not_abort_the_sweep_and_is_retried() {
        let fx = Fixture::with_store(CountingStore::failing_first(1)).await;
        fx.registered_intake(b"a").await;
        fx.registered_intake(b"b").await;
        fx.registered_result(b"c").await;
        fx.clock.advance(Duration::from_secs(31 * 60));
        let sweeper = sweeper(&fx);

        let first = sweeper.run_once().await;
        assert_eq!(first.failed, 1);
        assert_eq!(first.removed, 2);
        assert_eq!(fx.registry.counts().pending_deletion, 1);

        let second = sweeper.run_once().await;
        assert_eq!(second.removed, 1);
        assert!(fx.registry.is_empty());
        assert_eq!(fx.store.remove_calls(), 4);
    }

    #[tokio::test]
    async fn background_loop_sweeps_until_cancelled() {
        let fx = Fixture::new().await;
        fx.registered_intake(b"ts").await;
        fx.clock.advance(Duration::from_secs(31 * 60));
        let sweeper = Arc::new(ExpirySweeper::new(
            Arc::clone(&fx.registry),
            Arc::clone(&fx.clock) as Arc<dyn Clock>,
            Duration::from_millis(10),
            RETENTION,
        ));
        let token = CancellationToken::new();
        let tracker = TaskTracker::new();

        let handle = sweeper.spawn(token.clone(), &tracker);
        for _ in 0..200 {
            if fx.registry.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(fx.registry.is_empty());

        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
