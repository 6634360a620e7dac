use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Lossless, order-preserving concatenation of same-format audio
/// segments.
#[async_trait]
pub trait AudioMerger: Send + Sync {
    async fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), String>;
}

/// Concatenates audio files with ffmpeg's concat demuxer and stream
/// copy, so segments are joined without re-encoding.
pub struct FfmpegMerger {
    ffmpeg_path: String,
}

impl FfmpegMerger {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    fn write_concat_list(inputs: &[PathBuf]) -> Result<tempfile::NamedTempFile, String> {
        let mut list = tempfile::Builder::new()
            .prefix("voicetape-concat-")
            .suffix(".txt")
            .tempfile()
            .map_err(|e| format!("failed to create concat list: {}", e))?;
        for path in inputs {
            // Single quotes inside a quoted concat entry are escaped as '\''.
            let escaped = path.to_string_lossy().replace('\'', "'\\''");
            writeln!(list, "file '{}'", escaped)
                .map_err(|e| format!("failed to write concat list: {}", e))?;
        }
        list.flush()
            .map_err(|e| format!("failed to flush concat list: {}", e))?;
        Ok(list)
    }
}

#[async_trait]
impl AudioMerger for FfmpegMerger {
    async fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), String> {
        if inputs.is_empty() {
            return Err("no audio segments to merge".to_string());
        }
        if inputs.len() == 1 {
            tokio::fs::copy(&inputs[0], output)
                .await
                .map_err(|e| format!("failed to copy single segment: {}", e))?;
            return Ok(());
        }

        // Keep the list file alive until ffmpeg exits.
        let list = Self::write_concat_list(inputs)?;

        tracing::info!(
            segments = inputs.len(),
            output = %output.display(),
            "Concatenating audio segments with ffmpeg"
        );

        let result = Command::new(&self.ffmpeg_path)
            .arg("-f")
            .arg("concat")
            .arg("-safe")
            .arg("0")
            .arg("-i")
            .arg(list.path())
            .arg("-c")
            .arg("copy")
            .arg("-y")
            .arg(output)
            .output()
            .await
            .map_err(|e| format!("failed to launch {}: {}", self.ffmpeg_path, e))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            tracing::error!(
                status = %result.status,
                stderr = %stderr,
                "ffmpeg concat failed"
            );
            return Err(format!("ffmpeg exited with {}: {}", result.status, stderr));
        }

        Ok(())
    }
}
