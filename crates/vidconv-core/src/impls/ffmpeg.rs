//! FfmpegTranscoder - runs the `ffmpeg` binary.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::{ConversionError, TargetFormat};
use crate::ports::Transcoder;

/// Transcoder that shells out to ffmpeg.
///
/// The child is killed if the conversion future is dropped, which is how
/// the conversion timeout stops a runaway process.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Output options per target.
    ///
    /// Mp4 is tuned for small hosts: fastest preset, one thread, reduced
    /// quality and audio bitrate.
    fn output_options(format: TargetFormat) -> &'static [&'static str] {
        match format {
            TargetFormat::Mp4 => &[
                "-c:v", "libx264", "-preset", "ultrafast", "-crf", "28", "-threads", "1", "-c:a",
                "aac", "-b:a", "96k",
            ],
            TargetFormat::Yuv => &["-f", "rawvideo", "-pix_fmt", "yuv420p", "-threads", "1"],
        }
    }

    pub fn build_args(input: &Path, output: &Path, format: TargetFormat) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-y", "-i"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(input.as_os_str().to_owned());
        args.extend(Self::output_options(format).iter().map(OsString::from));
        args.push(output.as_os_str().to_owned());
        args
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        format: TargetFormat,
    ) -> Result<(), ConversionError> {
        let args = Self::build_args(input, output, format);
        debug!(program = %self.program.display(), ?args, "starting ffmpeg");
        let started = Instant::now();

        let result = Command::new(&self.program)
            .args(&args)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(ConversionError::Spawn)?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ConversionError::Failed {
                status: result.status.code().unwrap_or(-1),
                message: last_error_line(&stderr),
            });
        }

        debug!(
            %format,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ffmpeg finished"
        );
        Ok(())
    }
}

/// ffmpeg prints its actual complaint last.
fn last_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("unknown ffmpeg error")
        .to_string()
}
