use std::time::Duration;

use async_trait::async_trait;
use ffmpeg_next as ffmpeg;
use ffmpeg::codec::context::Context as CodecContext;
use ffmpeg::format::Pixel;
use ffmpeg::frame::Video as VideoFrame;
use ffmpeg::media::Type;
use ffmpeg::software::scaling::{Context as ScalingContext, Flags as ScalingFlags};
use tracing::debug;

use super::decode::{decode_first, PacketDecoder};
use super::{Frame, FrameSampler, SampleError};

/// Decodes frames in-process through libavformat/libavcodec.
///
/// Decoding blocks, so each grab runs on the blocking thread pool. The input
/// context lives only inside [`grab_blocking`] and is closed when it returns.
#[derive(Debug, Clone, Default)]
pub struct LibavSampler;

impl LibavSampler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FrameSampler for LibavSampler {
    async fn grab(&self, url: &str, position: Duration) -> Result<Frame, SampleError> {
        let owned = url.to_string();
        tokio::task::spawn_blocking(move || grab_blocking(&owned, position))
            .await
            .map_err(|e| SampleError::Decode {
                url: url.to_string(),
                reason: format!("decoder task failed: {}", e),
            })?
    }
}

fn grab_blocking(url: &str, position: Duration) -> Result<Frame, SampleError> {
    let open_err = |e: ffmpeg::Error| SampleError::Open {
        url: url.to_string(),
        reason: e.to_string(),
    };
    let decode_err = |e: ffmpeg::Error| SampleError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    };

    ffmpeg::init().map_err(open_err)?;
    let mut input = ffmpeg::format::input(&url).map_err(open_err)?;

    let (stream_index, decoder) = {
        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or_else(|| SampleError::NoVideoStream {
                url: url.to_string(),
            })?;
        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|ctx| ctx.decoder().video())
            .map_err(decode_err)?;
        (stream.index(), decoder)
    };

    if !position.is_zero() {
        // Container-level seek positions are in AV_TIME_BASE (microsecond) units.
        let target = i64::try_from(position.as_micros()).unwrap_or(i64::MAX);
        if let Err(e) = input.seek(target, ..target) {
            debug!(url, error = %e, "Seek not supported, decoding from current position");
        }
    }

    let mut video = VideoDecoder {
        decoder,
        frame: VideoFrame::empty(),
    };
    let packets = input
        .packets()
        .filter(|(stream, _)| stream.index() == stream_index)
        .map(|(_, packet)| packet);
    decode_first(url, &mut video, packets).map_err(|reason| SampleError::Decode {
        url: url.to_string(),
        reason,
    })?;

    to_rgb_frame(url, &video.frame)
}

struct VideoDecoder {
    decoder: ffmpeg::decoder::Video,
    frame: VideoFrame,
}

impl PacketDecoder for VideoDecoder {
    type Packet = ffmpeg::Packet;
    type Error = ffmpeg::Error;

    fn send(&mut self, packet: &ffmpeg::Packet) -> Result<(), ffmpeg::Error> {
        self.decoder.send_packet(packet)
    }

    fn receive(&mut self) -> bool {
        self.decoder.receive_frame(&mut self.frame).is_ok()
    }

    fn finish(&mut self) -> Result<(), ffmpeg::Error> {
        self.decoder.send_eof()
    }
}

fn to_rgb_frame(url: &str, decoded: &VideoFrame) -> Result<Frame, SampleError> {
    let decode_err = |reason: String| SampleError::Decode {
        url: url.to_string(),
        reason,
    };
    let (width, height) = (decoded.width(), decoded.height());

    let mut scaler = ScalingContext::get(
        decoded.format(),
        width,
        height,
        Pixel::RGB24,
        width,
        height,
        ScalingFlags::BILINEAR,
    )
    .map_err(|e| decode_err(e.to_string()))?;
    let mut rgb = VideoFrame::empty();
    scaler
        .run(decoded, &mut rgb)
        .map_err(|e| decode_err(e.to_string()))?;

    // Rows may be padded; copy only the visible part of each line.
    let stride = rgb.stride(0);
    let row_len = width as usize * 3;
    let plane = rgb.data(0);
    let mut packed = Vec::with_capacity(row_len * height as usize);
    for row in plane.chunks(stride).take(height as usize) {
        packed.extend_from_slice(&row[..row_len]);
    }

    Frame::from_rgb(width, height, packed)
        .ok_or_else(|| decode_err("decoded frame has an unexpected size".into()))
}
