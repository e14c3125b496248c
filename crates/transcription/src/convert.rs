use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("ffmpeg not found")]
    Unavailable,
    #[error("failed to run ffmpeg: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("ffmpeg exited with {0}")]
    Failed(ExitStatus),
}

/// External media conversion utility.
#[async_trait]
pub trait AudioConverter: Send + Sync + 'static {
    fn is_available(&self) -> bool;

    /// Re-encodes `input` as 16kHz mono PCM WAV at `output`.
    async fn to_mono_16k(&self, input: &Path, output: &Path) -> Result<(), ConversionError>;
}

pub struct FfmpegConverter {
    binary: Option<PathBuf>,
}

impl FfmpegConverter {
    /// Resolves `explicit` (a path or a bare name) or falls back to `ffmpeg`
    /// on the PATH.
    pub fn new(explicit: Option<&str>) -> Self {
        let binary = which::which(explicit.unwrap_or("ffmpeg")).ok();
        debug!(?binary, "Resolved ffmpeg");
        Self { binary }
    }

    pub fn binary(&self) -> Option<&Path> {
        self.binary.as_deref()
    }
}

#[async_trait]
impl AudioConverter for FfmpegConverter {
    fn is_available(&self) -> bool {
        self.binary.is_some()
    }

    async fn to_mono_16k(&self, input: &Path, output: &Path) -> Result<(), ConversionError> {
        let binary = self.binary.as_ref().ok_or(ConversionError::Unavailable)?;
        let status = Command::new(binary)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-ac", "1", "-ar", "16000"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;

        if status.success() {
            Ok(())
        } else {
            Err(ConversionError::Failed(status))
        }
    }
}
