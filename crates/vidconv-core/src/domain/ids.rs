//! Artifact identifiers.
//!
//! Ids are ULIDs: a millisecond timestamp followed by 80 random bits. They
//! sort by creation time, need no coordination to generate, and render as a
//! 26 character Crockford base32 string that is safe to use as a file stem.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use ulid::Ulid;

/// Identifier of a tracked artifact (intake or result).
///
/// Stable for the artifact's whole lifetime and reused as the stem of the
/// artifact's file name (`<id>.<ext>`).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(Ulid);

impl ArtifactId {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Milliseconds since the Unix epoch encoded in the id.
    pub fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }

    /// Recover the id from an artifact file name such as `01J...XYZ.mp4`.
    ///
    /// Only the stem is inspected; anything that is not a valid ULID yields
    /// `None`.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = Path::new(name).file_stem()?.to_str()?;
        stem.parse().ok()
    }
}

impl From<Ulid> for ArtifactId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Returned when a string is not a valid artifact id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid artifact id: {0:?}")]
pub struct ParseIdError(pub String);

impl FromStr for ArtifactId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s)
            .map(Self)
            .map_err(|_| ParseIdError(s.to_string()))
    }
}
