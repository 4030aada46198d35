//! Storage: where artifacts live on disk.

mod paths;

pub use paths::StoragePaths;
