//! Video transcoding capability.
//!
//! The pipeline is tool-agnostic: it talks to a [`VideoTranscoder`] and only
//! cares about the path-in/path-out contract. Success means the tool exited
//! zero *and* the output file exists; anything else is a transform failure the
//! caller degrades from. The stock implementation shells out to HandBrakeCLI
//! for transcoding and ffmpeg for poster frames.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::Result;

pub const DEFAULT_HANDBRAKE_BIN: &str = "/usr/bin/HandBrakeCLI";
pub const DEFAULT_FFMPEG_BIN: &str = "/usr/bin/ffmpeg";

#[async_trait]
pub trait VideoTranscoder: Send + Sync {
    /// Transcode `input` into `output` with the named quality profile.
    /// `Ok(false)` means the tool failed and the caller should fall back to a
    /// verbatim copy; hard errors are reserved for I/O problems on our side.
    async fn transcode(&self, input: &Path, output: &Path, profile: &str) -> Result<bool>;

    /// Extract a poster frame from `input` into `output`.
    async fn extract_poster(&self, input: &Path, output: &Path) -> Result<bool>;
}

/// Subprocess transcoder: HandBrakeCLI + ffmpeg.
#[derive(Debug, Clone)]
pub struct CliTranscoder {
    handbrake: PathBuf,
    ffmpeg: PathBuf,
}

impl CliTranscoder {
    pub fn new() -> Self {
        Self {
            handbrake: PathBuf::from(DEFAULT_HANDBRAKE_BIN),
            ffmpeg: PathBuf::from(DEFAULT_FFMPEG_BIN),
        }
    }

    pub fn with_binaries(handbrake: impl Into<PathBuf>, ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            handbrake: handbrake.into(),
            ffmpeg: ffmpeg.into(),
        }
    }

    async fn run_tool(&self, tool: &Path, args: Vec<std::ffi::OsString>, output: &Path) -> bool {
        debug!(tool = %tool.display(), "invoking external transform tool");
        match Command::new(tool).args(&args).output().await {
            Ok(result) if result.status.success() => {
                let produced = tokio::fs::try_exists(output).await.unwrap_or(false);
                if !produced {
                    warn!(
                        tool = %tool.display(),
                        output = %output.display(),
                        "tool exited zero but produced no output file"
                    );
                }
                produced
            }
            Ok(result) => {
                warn!(
                    tool = %tool.display(),
                    code = ?result.status.code(),
                    stderr = %String::from_utf8_lossy(&result.stderr),
                    "transform tool failed"
                );
                false
            }
            Err(e) => {
                warn!(tool = %tool.display(), error = %e, "transform tool could not be spawned");
                false
            }
        }
    }
}

impl Default for CliTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoTranscoder for CliTranscoder {
    async fn transcode(&self, input: &Path, output: &Path, profile: &str) -> Result<bool> {
        info!(
            input = %input.display(),
            output = %output.display(),
            profile,
            "transcoding video"
        );
        let args: Vec<std::ffi::OsString> = vec![
            "-O".into(),
            "-Z".into(),
            format!("Fast {}", profile).into(),
            "-i".into(),
            input.into(),
            "-o".into(),
            output.into(),
        ];
        Ok(self.run_tool(&self.handbrake, args, output).await)
    }

    async fn extract_poster(&self, input: &Path, output: &Path) -> Result<bool> {
        info!(input = %input.display(), output = %output.display(), "extracting poster frame");
        let args: Vec<std::ffi::OsString> = vec![
            "-i".into(),
            input.into(),
            "-ss".into(),
            "00:00:01.000".into(),
            "-vframes".into(),
            "1".into(),
            output.into(),
        ];
        Ok(self.run_tool(&self.ffmpeg, args, output).await)
    }
}
