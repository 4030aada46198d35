//! Ports - seams between the lifecycle core and the outside world.
//!
//! Each trait hides one external concern (time, randomness, the filesystem,
//! the transcoder binary) so the registry and the background loops can be
//! driven deterministically in tests.

pub mod artifact_store;
pub mod clock;
pub mod id_generator;
pub mod transcoder;

pub use self::artifact_store::{ArtifactStore, RemoveOutcome, StoredFile};
pub use self::clock::{Clock, FixedClock, ManualClock, SystemClock};
pub use self::id_generator::{IdGenerator, IntakeName, UlidGenerator};
pub use self::transcoder::Transcoder;
