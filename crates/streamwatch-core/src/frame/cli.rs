use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{Frame, FrameSampler, SampleError};

/// Samples frames by running the `ffmpeg` executable and reading a single
/// PNG image from its stdout.
#[derive(Debug, Clone)]
pub struct FfmpegCliSampler {
    program: PathBuf,
}

impl FfmpegCliSampler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, url: &str, position: Duration) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-hide_banner", "-nostdin", "-loglevel", "error"])
            .arg("-ss")
            .arg(format!("{:.3}", position.as_secs_f64()))
            .arg("-i")
            .arg(url)
            .args(["-map", "0:v:0", "-frames:v", "1"])
            .args(["-f", "image2pipe", "-vcodec", "png", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for FfmpegCliSampler {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

/// Map a failed ffmpeg run to an error using its stderr.
fn classify_failure(url: &str, stderr: &str) -> SampleError {
    let reason = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .unwrap_or("ffmpeg exited with an error")
        .to_string();

    if stderr.contains("matches no streams") {
        SampleError::NoVideoStream {
            url: url.to_string(),
        }
    } else if stderr.contains("Error while decoding") || stderr.contains("Could not find codec") {
        SampleError::Decode {
            url: url.to_string(),
            reason,
        }
    } else {
        SampleError::Open {
            url: url.to_string(),
            reason,
        }
    }
}

#[async_trait]
impl FrameSampler for FfmpegCliSampler {
    async fn grab(&self, url: &str, position: Duration) -> Result<Frame, SampleError> {
        debug!(url, position_ms = position.as_millis() as u64, "Sampling frame with ffmpeg");

        // `output()` waits for the child; `kill_on_drop` covers cancellation.
        let output = self
            .command(url, position)
            .output()
            .await
            .map_err(|e| SampleError::Open {
                url: url.to_string(),
                reason: format!("failed to run {}: {}", self.program.display(), e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(url, &stderr));
        }

        if output.stdout.is_empty() {
            return Err(SampleError::Decode {
                url: url.to_string(),
                reason: "ffmpeg produced no frame".into(),
            });
        }

        let image = image::load_from_memory(&output.stdout).map_err(|e| SampleError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Frame::from_image(image))
    }
}
