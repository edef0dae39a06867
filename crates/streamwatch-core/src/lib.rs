#![forbid(unsafe_code)]

pub mod checker;
pub mod config;
mod error;
pub mod frame;
pub mod monitor;
pub mod notify;
pub mod playlist;

pub use checker::{check_liveness, CheckError, HttpChecker, LivenessCheck};
pub use config::{MonitorConfig, TelegramConfig};
#[cfg(feature = "libav")]
pub use frame::LibavSampler;
pub use frame::{
    capture_frame, is_frame_valid, CaptureError, FfmpegCliSampler, Frame, FrameSampler,
    SampleError,
};
pub use monitor::{LinkOutcome, LinkReport, Monitor, RunReport};
pub use notify::{Delivery, Notifier, TelegramNotifier};
pub use playlist::{parse_links, read_links, PlaylistError};
