//! Domain model (ids, artifacts, lifecycle state, formats, errors).

pub mod artifact;
pub mod errors;
pub mod format;
pub mod ids;
pub mod state;

pub use self::artifact::{Artifact, ArtifactRole};
pub use self::errors::{ConversionError, ErrorKind, LifecycleError};
pub use self::format::{INTAKE_EXTENSION, TargetFormat, UnknownFormat, is_intake_extension};
pub use self::ids::{ArtifactId, ParseIdError};
pub use self::state::ArtifactState;
