//! IdGenerator port - naming of new artifacts.
//!
//! Ids are ULIDs built from the injected clock plus randomness, so a
//! `FixedClock` gives deterministic timestamps in tests while ids stay
//! unique.

use std::path::Path;

use ulid::Ulid;

use crate::domain::{ArtifactId, INTAKE_EXTENSION, LifecycleError, is_intake_extension};
use crate::ports::Clock;

/// Name assigned to an incoming upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeName {
    pub id: ArtifactId,
    /// `<id>.<extension>`, the name used on disk and in URLs.
    pub file_name: String,
    /// Extension as the client spelled it.
    pub extension: String,
}

/// IdGenerator produces collision-resistant, time-sortable ids.
///
/// # Thread Safety
/// - `Send + Sync` so one generator serves every request task
pub trait IdGenerator: Send + Sync {
    fn generate_artifact_id(&self) -> ArtifactId;

    /// Name an upload after validating its extension.
    ///
    /// Only the extension of `original_name` is used; directory components
    /// and the rest of the client's file name never reach the filesystem.
    /// Rejects anything outside the intake allow-list with
    /// `UnsupportedFormat`. No side effects.
    fn name_upload(&self, original_name: &str) -> Result<IntakeName, LifecycleError> {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        if !is_intake_extension(extension) {
            return Err(LifecycleError::UnsupportedFormat {
                extension: extension.to_string(),
                allowed: INTAKE_EXTENSION,
            });
        }

        let id = self.generate_artifact_id();
        Ok(IntakeName {
            id,
            file_name: format!("{id}.{extension}"),
            extension: extension.to_string(),
        })
    }
}

/// UlidGenerator stamps ids with the time reported by its clock.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_artifact_id(&self) -> ArtifactId {
        let timestamp_ms = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
        ArtifactId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use std::collections::HashSet;

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);

        let ids: HashSet<_> = (0..1000).map(|_| id_gen.generate_artifact_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn ulid_generator_uses_clock_timestamp() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.generate_artifact_id();
        let id2 = id_gen.generate_artifact_id();

        assert_ne!(id1, id2);
        assert_eq!(id1.timestamp_ms(), fixed_time.timestamp_millis() as u64);
        assert_eq!(id2.timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }

    #[rstest]
    #[case("match.ts", "ts")]
    #[case("MATCH.TS", "TS")]
    #[case("my.recording.Ts", "Ts")]
    #[case("../../uploads/clip.ts", "ts")]
    fn upload_keeps_original_extension(#[case] original: &str, #[case] extension: &str) {
        let id_gen = UlidGenerator::new(SystemClock);

        let name = id_gen.name_upload(original).unwrap();
        assert_eq!(name.extension, extension);
        assert_eq!(name.file_name, format!("{}.{extension}", name.id));
        assert_eq!(ArtifactId::from_file_name(&name.file_name), Some(name.id));
    }

    #[rstest]
    #[case("movie.mp4")]
    #[case("archive.ts.zip")]
    #[case("no_extension")]
    #[case(".ts")]
    #[case("")]
    fn upload_outside_allow_list_is_rejected(#[case] original: &str) {
        let id_gen = UlidGenerator::new(SystemClock);

        let err = id_gen.name_upload(original).unwrap_err();
        assert!(matches!(err, LifecycleError::UnsupportedFormat { .. }));
    }
}
