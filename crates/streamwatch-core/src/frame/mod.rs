//! Single-frame sampling and validation.
//!
//! A [`FrameSampler`] opens a stream, seeks and decodes exactly one frame.
//! [`capture_frame`] validates that frame and only then writes it to disk.

mod cli;
#[cfg(any(feature = "libav", test))]
mod decode;
#[cfg(feature = "libav")]
mod libav;

pub use cli::FfmpegCliSampler;
#[cfg(feature = "libav")]
pub use libav::LibavSampler;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, RgbImage};
use thiserror::Error;
use tracing::{info, warn};

use crate::notify::Notifier;

/// A decoded RGB24 frame.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    /// Wrap a tightly packed RGB24 buffer. Returns `None` if the buffer
    /// length does not match `width * height * 3`.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbImage::from_raw(width, height, data).map(|image| Self { image })
    }

    pub fn from_image(image: DynamicImage) -> Self {
        Self {
            image: image.to_rgb8(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Sum of every channel value of every pixel.
    pub fn pixel_sum(&self) -> u64 {
        self.image.as_raw().iter().map(|&b| u64::from(b)).sum()
    }

    /// Write the frame; the format follows the file extension.
    pub fn save(&self, path: &Path) -> Result<(), image::ImageError> {
        self.image.save(path)
    }
}

/// A frame is invalid when it is absent or fully black (pixel sum of zero).
pub fn is_frame_valid(frame: Option<&Frame>) -> bool {
    match frame {
        Some(frame) => frame.pixel_sum() != 0,
        None => false,
    }
}

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("unable to open video {url}: {reason}")]
    Open { url: String, reason: String },
    #[error("no video stream in {url}")]
    NoVideoStream { url: String },
    #[error("unable to decode a frame from {url}: {reason}")]
    Decode { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Sample(#[from] SampleError),
    #[error("captured frame is empty or black ({url})")]
    BlackFrame { url: String },
    #[error("failed to write frame to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Opens a stream, seeks to `position` and decodes one frame.
///
/// Implementations must release the underlying stream before returning,
/// on success and on every error.
#[async_trait]
pub trait FrameSampler: Send + Sync {
    async fn grab(&self, url: &str, position: Duration) -> Result<Frame, SampleError>;
}

/// Grab one frame from `url`, validate it and write it to `output`.
///
/// Decode failures and black frames are reported through `notifier`; a
/// stream that cannot be opened is only logged. Nothing is written unless
/// the frame is valid.
pub async fn capture_frame(
    sampler: &dyn FrameSampler,
    notifier: &dyn Notifier,
    url: &str,
    output: &Path,
    position: Duration,
) -> Result<Frame, CaptureError> {
    let frame = match sampler.grab(url, position).await {
        Ok(frame) => frame,
        Err(e @ SampleError::Open { .. }) => {
            warn!(url, error = %e, "Unable to open video");
            return Err(e.into());
        }
        Err(e) => {
            warn!(url, error = %e, "Unable to capture a frame");
            notifier
                .send(&format!("Unable to capture a frame for video: {}", url))
                .await;
            return Err(e.into());
        }
    };

    if !is_frame_valid(Some(&frame)) {
        warn!(url, "Captured frame is empty or black");
        notifier
            .send(&format!("Captured frame is empty or black. (URL: {})", url))
            .await;
        return Err(CaptureError::BlackFrame {
            url: url.to_string(),
        });
    }

    frame.save(output).map_err(|source| CaptureError::Write {
        path: output.to_path_buf(),
        source,
    })?;
    info!(
        url,
        output = %output.display(),
        width = frame.width(),
        height = frame.height(),
        "Frame captured"
    );
    Ok(frame)
}
