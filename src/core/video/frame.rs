use image::RgbImage;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("failed to open video {path}: {reason}")]
    Open { path: String, reason: String },
    #[error("failed to seek to frame {frame}: {reason}")]
    Seek { frame: u64, reason: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("video has no frames: {0}")]
    NoFrames(String),
}

/// 视频元数据
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoDetails {
    pub fps: f64,
    pub frame_count: u64,
    pub width: u32,
    pub height: u32,
}

/// 解码出的一帧及其显示时间戳（毫秒，由解码器给出，而非由帧号推算）
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub image: RgbImage,
    pub timestamp_ms: f64,
}

impl DecodedFrame {
    pub fn new(image: RgbImage, timestamp_ms: f64) -> Self {
        Self {
            image,
            timestamp_ms,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// 视频源。解码状态不可共享，每个 worker 通过 `open` 拿到独立句柄
pub trait VideoBackend: Send + Sync {
    fn details(&self, path: &Path) -> Result<VideoDetails, VideoError>;

    fn open(&self, path: &Path) -> Result<Box<dyn VideoHandle>, VideoError>;
}

pub trait VideoHandle: Send {
    fn seek(&mut self, frame_index: u64) -> Result<(), VideoError>;

    /// `Ok(None)` means the decoder produced no data for this read
    /// (a glitch or end of stream); callers count it toward a retry cap.
    fn read(&mut self) -> Result<Option<DecodedFrame>, VideoError>;
}

/// 帧号转 `HH:MM:SS:mmm`，仅用于日志
pub fn frame_to_timecode(frame_no: u64, fps: f64) -> String {
    let ms = frame_no as f64 / fps * 1000.0;
    crate::core::subtitle::timecode(ms).replace(',', ":")
}
