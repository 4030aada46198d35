//! vidconv-core
//!
//! Lifecycle management for the short-lived files of the video converter:
//! naming uploads, tracking every file on disk, and deleting each one
//! exactly once, either after delivery or when it outlives the retention
//! window.
//!
//! # Modules
//! - **domain**: ids, artifacts, target formats, errors
//! - **ports**: Clock, IdGenerator, ArtifactStore, Transcoder
//! - **registry**: the in-memory artifact registry
//! - **storage**: the intake and results directories
//! - **app**: intake, conversion, reaper, sweeper, wiring
//! - **impls**: local filesystem store, ffmpeg transcoder
//! - **config**: timings and limits

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod registry;
pub mod storage;

#[cfg(test)]
mod testing;

pub use app::{BuildError, Lifecycle, LifecycleBuilder};
pub use config::{ConfigError, LifecycleConfig};
pub use domain::{ArtifactId, ErrorKind, LifecycleError, TargetFormat};
pub use storage::StoragePaths;
