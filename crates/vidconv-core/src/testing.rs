//! Shared test fixtures.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use crate::domain::{Artifact, ArtifactId, ArtifactRole, ConversionError, TargetFormat};
use crate::impls::LocalArtifactStore;
use crate::ports::{
    ArtifactStore, Clock, IdGenerator, ManualClock, RemoveOutcome, StoredFile, Transcoder,
    UlidGenerator,
};
use crate::registry::ArtifactRegistry;
use crate::storage::StoragePaths;

/// Local store that counts removals and can be told to fail the first few.
pub(crate) struct CountingStore {
    inner: LocalArtifactStore,
    removes: AtomicUsize,
    failures_left: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::failing_first(0)
    }

    pub fn failing_first(failures: usize) -> Self {
        Self {
            inner: LocalArtifactStore::new(),
            removes: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(failures),
        }
    }

    pub fn remove_calls(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactStore for CountingStore {
    async fn remove(&self, path: &Path) -> io::Result<RemoveOutcome> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "injected failure"));
        }
        self.inner.remove(path).await
    }

    async fn list(&self, dir: &Path) -> io::Result<Vec<StoredFile>> {
        self.inner.list(dir).await
    }
}

/// How a [`FakeTranscoder`] behaves.
#[derive(Debug, Clone, Copy)]
pub(crate) enum FakeBehavior {
    /// Write a small output file and succeed.
    Succeed,
    /// Write a partial output file, then fail.
    Fail,
    /// Succeed without writing anything.
    NoOutput,
    /// Never finish.
    Hang,
}

pub(crate) struct FakeTranscoder {
    behavior: FakeBehavior,
    calls: AtomicUsize,
}

impl FakeTranscoder {
    pub fn new(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        format: TargetFormat,
    ) -> Result<(), ConversionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::fs::metadata(input).await.map_err(ConversionError::Spawn)?;
        match self.behavior {
            FakeBehavior::Succeed => {
                tokio::fs::write(output, format!("converted to {format}"))
                    .await
                    .map_err(ConversionError::Spawn)?;
                Ok(())
            }
            FakeBehavior::Fail => {
                tokio::fs::write(output, b"partial")
                    .await
                    .map_err(ConversionError::Spawn)?;
                Err(ConversionError::Failed {
                    status: 1,
                    message: "Invalid data found when processing input".to_string(),
                })
            }
            FakeBehavior::NoOutput => Ok(()),
            FakeBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }
}

/// Temp directories, a manual clock and a registry wired together.
pub(crate) struct Fixture {
    pub paths: StoragePaths,
    pub clock: Arc<ManualClock>,
    pub ids: Arc<dyn IdGenerator>,
    pub store: Arc<CountingStore>,
    pub registry: Arc<ArtifactRegistry>,
    _root: TempDir,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_store(CountingStore::new()).await
    }

    pub async fn with_store(store: CountingStore) -> Self {
        let root = tempfile::tempdir().unwrap();
        let paths = StoragePaths::ensure(root.path().join("uploads"), root.path().join("outputs"))
            .await
            .unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        let store = Arc::new(store);
        let registry = Arc::new(ArtifactRegistry::new(
            Arc::clone(&store) as Arc<dyn ArtifactStore>,
            Arc::clone(&clock) as Arc<dyn Clock>,
        ));

        Self {
            paths,
            clock,
            ids,
            store,
            registry,
            _root: root,
        }
    }

    /// Write `<id>.ts` into the intake directory without registering it.
    pub async fn intake_file(&self, bytes: &[u8]) -> (ArtifactId, PathBuf) {
        let id = self.ids.generate_artifact_id();
        let path = self.paths.intake_path(&format!("{id}.ts"));
        tokio::fs::write(&path, bytes).await.unwrap();
        (id, path)
    }

    pub async fn registered_intake(&self, bytes: &[u8]) -> Artifact {
        let (id, path) = self.intake_file(bytes).await;
        self.registry
            .register(id, path, ArtifactRole::Intake)
            .unwrap()
    }

    pub async fn registered_result(&self, bytes: &[u8]) -> Artifact {
        let id = self.ids.generate_artifact_id();
        let path = self.paths.result_path(id, TargetFormat::Mp4);
        tokio::fs::write(&path, bytes).await.unwrap();
        self.registry
            .register(id, path, ArtifactRole::Result)
            .unwrap()
    }
}
