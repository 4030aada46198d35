//! Transcoder port - the external conversion step.
//!
//! The core treats conversion as opaque: read `input`, write `output`, or
//! fail. It never inspects the media.

use std::path::Path;

use async_trait::async_trait;

use crate::domain::{ConversionError, TargetFormat};

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Convert `input` into `output` in the requested format.
    ///
    /// `input` must not be modified. On error `output` may be partially
    /// written; the caller cleans it up.
    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        format: TargetFormat,
    ) -> Result<(), ConversionError>;
}
