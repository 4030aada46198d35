//! PostConsumptionReaper - deferred removal of delivered results.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;

use crate::domain::ArtifactId;
use crate::registry::{ArtifactRegistry, DeleteOutcome};

/// Schedules one delayed reclaim per completed delivery.
///
/// # Shutdown
/// Once the token is cancelled, reaps still waiting out their grace delay
/// are abandoned without touching the registry; the artifact stays Active
/// and the sweeper (or the rebuild after a restart) picks it up. A reap that
/// has already started deleting runs to completion, and the tracker lets
/// shutdown wait for it.
pub struct PostConsumptionReaper {
    registry: Arc<ArtifactRegistry>,
    grace: Duration,
    token: CancellationToken,
    tracker: TaskTracker,
}

impl PostConsumptionReaper {
    pub fn new(
        registry: Arc<ArtifactRegistry>,
        grace: Duration,
        token: CancellationToken,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            registry,
            grace,
            token,
            tracker,
        }
    }

    /// Reclaim `id` after the grace delay.
    ///
    /// Returns `false` if shutdown has begun and nothing was scheduled. The
    /// artifact remains downloadable until the delay elapses.
    pub fn schedule(&self, id: ArtifactId) -> bool {
        if self.token.is_cancelled() {
            return false;
        }

        let registry = Arc::clone(&self.registry);
        let token = self.token.clone();
        let grace = self.grace;
        self.tracker.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(artifact_id = %id, "reap abandoned at shutdown");
                    return;
                }
                _ = tokio::time::sleep(grace) => {}
            }

            match registry.reclaim(id).await {
                DeleteOutcome::Skipped => {
                    debug!(artifact_id = %id, "delivered artifact was already reclaimed")
                }
                outcome => debug!(artifact_id = %id, ?outcome, "delivered artifact reaped"),
            }
        });

        debug!(artifact_id = %id, grace_ms = grace.as_millis() as u64, "reap scheduled");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    fn reaper(fx: &Fixture, grace: Duration) -> (PostConsumptionReaper, CancellationToken, TaskTracker) {
        let token = CancellationToken::new();
        let tracker = TaskTracker::new();
        let reaper = PostConsumptionReaper::new(
            Arc::clone(&fx.registry),
            grace,
            token.clone(),
            tracker.clone(),
        );
        (reaper, token, tracker)
    }

    #[tokio::test]
    async fn delivered_result_is_removed_after_grace() {
        let fx = Fixture::new().await;
        let result = fx.registered_result(b"mp4").await;
        let (reaper, _token, tracker) = reaper(&fx, Duration::from_millis(50));

        assert!(reaper.schedule(result.id));
        // Still downloadable inside the grace window.
        assert!(fx.registry.get_active(result.id, None).is_some());
        assert!(result.path.exists());

        tracker.close();
        tracker.wait().await;

        assert_eq!(fx.registry.get(result.id), None);
        assert!(!result.path.exists());
    }

    #[tokio::test]
    async fn reap_after_sweep_is_a_clean_no_op() {
        let fx = Fixture::new().await;
        let result = fx.registered_result(b"mp4").await;
        let (reaper, _token, tracker) = reaper(&fx, Duration::from_millis(10));

        assert!(reaper.schedule(result.id));
        assert!(fx.registry.reclaim(result.id).await.is_reclaimed());

        tracker.close();
        tracker.wait().await;
        assert_eq!(fx.store.remove_calls(), 1);
    }

    #[tokio::test]
    async fn repeated_deliveries_remove_once() {
        let fx = Fixture::new().await;
        let result = fx.registered_result(b"mp4").await;
        let (reaper, _token, tracker) = reaper(&fx, Duration::from_millis(10));

        assert!(reaper.schedule(result.id));
        assert!(reaper.schedule(result.id));

        tracker.close();
        tracker.wait().await;
        assert_eq!(fx.store.remove_calls(), 1);
        assert!(fx.registry.is_empty());
    }

    #[tokio::test]
    async fn pending_reaps_are_abandoned_on_shutdown() {
        let fx = Fixture::new().await;
        let result = fx.registered_result(b"mp4").await;
        let (reaper, token, tracker) = reaper(&fx, Duration::from_secs(3600));

        assert!(reaper.schedule(result.id));
        token.cancel();
        tracker.close();
        tokio::time::timeout(Duration::from_secs(5), tracker.wait())
            .await
            .unwrap();

        assert!(fx.registry.get_active(result.id, None).is_some());
        assert!(result.path.exists());
        assert!(!reaper.schedule(result.id));
        assert_eq!(fx.store.remove_calls(), 0);
    }
}
