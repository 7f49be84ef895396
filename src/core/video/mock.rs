use crate::core::area::SubtitleArea;
use crate::core::video::frame::{DecodedFrame, VideoBackend, VideoDetails, VideoError, VideoHandle};
use image::{Rgb, RgbImage};
use std::path::Path;

const BACKGROUND: Rgb<u8> = Rgb([30, 30, 30]);
const TEXT: Rgb<u8> = Rgb([255, 255, 255]);

/// 模拟字幕：帧区间 `[start_frame, end_frame)` 内在 `band` 位置画一条白色条带
#[derive(Debug, Clone, Copy)]
pub struct SyntheticSubtitle {
    pub start_frame: u64,
    pub end_frame: u64,
    pub band: SubtitleArea,
}

/// 合成视频源，用于在没有真实解码器时驱动整条流水线
#[derive(Debug, Clone)]
pub struct SyntheticVideo {
    details: VideoDetails,
    subtitles: Vec<SyntheticSubtitle>,
    dropped_reads_from: Option<u64>,
    failing_seek_at: Option<u64>,
}

impl SyntheticVideo {
    pub fn new(fps: f64, frame_count: u64, width: u32, height: u32) -> Self {
        Self {
            details: VideoDetails {
                fps,
                frame_count,
                width,
                height,
            },
            subtitles: Vec::new(),
            dropped_reads_from: None,
            failing_seek_at: None,
        }
    }

    pub fn with_subtitle(mut self, start_frame: u64, end_frame: u64, band: SubtitleArea) -> Self {
        self.subtitles.push(SyntheticSubtitle {
            start_frame,
            end_frame,
            band,
        });
        self
    }

    /// 从第 `frame` 帧起解码器不再返回数据
    pub fn with_dropped_reads_from(mut self, frame: u64) -> Self {
        self.dropped_reads_from = Some(frame);
        self
    }

    pub fn with_failing_seek_at(mut self, frame: u64) -> Self {
        self.failing_seek_at = Some(frame);
        self
    }

    pub fn timestamp_ms(&self, frame_no: u64) -> f64 {
        frame_no as f64 * 1000.0 / self.details.fps
    }

    fn render(&self, frame_no: u64) -> RgbImage {
        let mut image = RgbImage::from_pixel(self.details.width, self.details.height, BACKGROUND);
        for sub in &self.subtitles {
            if (sub.start_frame..sub.end_frame).contains(&frame_no) {
                let band = sub.band;
                for y in band.y1..band.y2.min(self.details.height) {
                    for x in band.x1..band.x2.min(self.details.width) {
                        image.put_pixel(x, y, TEXT);
                    }
                }
            }
        }
        image
    }
}

impl VideoBackend for SyntheticVideo {
    fn details(&self, _path: &Path) -> Result<VideoDetails, VideoError> {
        Ok(self.details)
    }

    fn open(&self, _path: &Path) -> Result<Box<dyn VideoHandle>, VideoError> {
        Ok(Box::new(SyntheticHandle {
            video: self.clone(),
            position: 0,
        }))
    }
}

struct SyntheticHandle {
    video: SyntheticVideo,
    position: u64,
}

impl VideoHandle for SyntheticHandle {
    fn seek(&mut self, frame_index: u64) -> Result<(), VideoError> {
        if self.video.failing_seek_at == Some(frame_index) {
            return Err(VideoError::Seek {
                frame: frame_index,
                reason: "synthetic seek failure".to_string(),
            });
        }
        self.position = frame_index;
        Ok(())
    }

    fn read(&mut self) -> Result<Option<DecodedFrame>, VideoError> {
        if self.position >= self.video.details.frame_count {
            return Ok(None);
        }
        if matches!(self.video.dropped_reads_from, Some(from) if self.position >= from) {
            return Ok(None);
        }
        let frame_no = self.position;
        self.position += 1;
        Ok(Some(DecodedFrame::new(
            self.video.render(frame_no),
            self.video.timestamp_ms(frame_no),
        )))
    }
}
