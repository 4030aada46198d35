//! Impls - production implementations of the ports.

pub mod ffmpeg;
pub mod local_store;

pub use self::ffmpeg::FfmpegTranscoder;
pub use self::local_store::LocalArtifactStore;
