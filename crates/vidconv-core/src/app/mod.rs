//! App - the lifecycle services built on top of the registry.
//!
//! # Components
//! - **IntakeService**: upload -> named file -> Intake artifact
//! - **ConversionService**: Intake -> transcoder -> Result, then intake cleanup
//! - **PostConsumptionReaper**: delayed removal after delivery
//! - **ExpirySweeper**: periodic age-based removal
//! - **LifecycleBuilder**: wiring and fail-fast validation

pub mod builder;
pub mod conversion;
pub mod intake;
pub mod reaper;
pub mod status;
pub mod sweeper;

pub use self::builder::{BuildError, Lifecycle, LifecycleBuilder};
pub use self::conversion::ConversionService;
pub use self::intake::{IntakeService, UploadReceipt};
pub use self::reaper::PostConsumptionReaper;
pub use self::status::RegistryCounts;
pub use self::sweeper::{ExpirySweeper, SweepReport};
