//! Accepted intake format and supported conversion targets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The only extension accepted at upload (MPEG transport stream).
pub const INTAKE_EXTENSION: &str = "ts";

/// Whether `extension` (without the dot) is on the intake allow-list.
///
/// Matching ignores ASCII case so `clip.TS` is accepted; the original
/// spelling is still what ends up in the stored file name.
pub fn is_intake_extension(extension: &str) -> bool {
    extension.eq_ignore_ascii_case(INTAKE_EXTENSION)
}

/// Output format requested from the transcoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    /// H.264 + AAC in an MP4 container.
    Mp4,
    /// Raw planar YUV 4:2:0 frames, no container.
    Yuv,
}

impl TargetFormat {
    /// File extension of the produced result, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Mp4 => "mp4",
            TargetFormat::Yuv => "yuv",
        }
    }

    /// MIME type used when the result is delivered.
    pub fn content_type(self) -> &'static str {
        match self {
            TargetFormat::Mp4 => "video/mp4",
            TargetFormat::Yuv => "application/octet-stream",
        }
    }

    /// Guess the format of a result file from its extension.
    pub fn from_extension(extension: &str) -> Option<Self> {
        extension.parse().ok()
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown target format: {0:?}")]
pub struct UnknownFormat(pub String);

impl FromStr for TargetFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("mp4") {
            Ok(TargetFormat::Mp4)
        } else if s.eq_ignore_ascii_case("yuv") {
            Ok(TargetFormat::Yuv)
        } else {
            Err(UnknownFormat(s.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ts", true)]
    #[case("TS", true)]
    #[case("Ts", true)]
    #[case("mp4", false)]
    #[case("tsx", false)]
    #[case("", false)]
    fn intake_allow_list(#[case] extension: &str, #[case] accepted: bool) {
        assert_eq!(is_intake_extension(extension), accepted);
    }

    #[rstest]
    #[case("mp4", TargetFormat::Mp4)]
    #[case("MP4", TargetFormat::Mp4)]
    #[case("yuv", TargetFormat::Yuv)]
    fn target_format_parses(#[case] input: &str, #[case] expected: TargetFormat) {
        assert_eq!(input.parse::<TargetFormat>().unwrap(), expected);
    }

    #[test]
    fn unknown_target_is_rejected() {
        assert!("avi".parse::<TargetFormat>().is_err());
        assert_eq!(TargetFormat::from_extension("mkv"), None);
    }

    #[test]
    fn extension_round_trips_through_display() {
        assert_eq!(TargetFormat::Mp4.to_string(), "mp4");
        assert_eq!(TargetFormat::from_extension("yuv"), Some(TargetFormat::Yuv));
    }
}
