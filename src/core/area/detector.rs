//! 字幕区域自动检测
//!
//! 不扫描整个视频，而是在总时长的 `split_start..split_stop` 之间取三个代表性窗口，
//! 每个窗口按约每秒一帧抽帧，只做 OCR 检测，把所有检测框合并成一个外接矩形，
//! 再按画面比例做水平内边距、按绝对像素做垂直内边距。

use crate::core::area::rect::SubtitleArea;
use crate::core::cache::{self, CacheDir};
use crate::core::cancel::{CancellationToken, StageOutcome};
use crate::core::config::{DetectionConfig, ExtractorConfig, FrameExtractionConfig};
use crate::core::error::ExtractError;
use crate::core::ocr::engine::{OcrBackend, OcrOptions};
use crate::core::video::frame::{frame_to_timecode, VideoBackend, VideoDetails};
use crate::core::video::sampler::{FrameSampler, SampleRequest};
use log::{debug, error, info, warn};
use std::path::Path;

/// 检测窗口 `[start, end)`，单位为帧号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionWindow {
    pub start: u64,
    pub end: u64,
}

/// `(x1, y1, x2, y2)`，允许暂时越界（内边距可能推到画面外）
type Envelope = (i64, i64, i64, i64);

pub struct SubtitleAreaDetector<'a> {
    video: &'a dyn VideoBackend,
    ocr: &'a dyn OcrBackend,
    config: &'a ExtractorConfig,
}

impl<'a> SubtitleAreaDetector<'a> {
    pub fn new(video: &'a dyn VideoBackend, ocr: &'a dyn OcrBackend, config: &'a ExtractorConfig) -> Self {
        Self { video, ocr, config }
    }

    /// 候选起点为 `[total * split_start, total * split_stop)` 内的每一帧，
    /// 多于三个时取首、中、尾三个；最后一个窗口超出总帧数时截到 `split_stop` 处
    pub fn key_windows(frame_count: u64, config: &DetectionConfig) -> Vec<DetectionWindow> {
        let relative_start = (frame_count as f64 * config.split_start) as u64;
        let relative_stop = (frame_count as f64 * config.split_stop) as u64;
        let candidates = relative_stop.saturating_sub(relative_start);
        if candidates == 0 {
            return Vec::new();
        }

        let window = |start: u64| DetectionWindow {
            start,
            end: start + config.window_frames,
        };
        let mut windows = if candidates > 3 {
            vec![
                window(relative_start),
                window(relative_start + candidates / 2),
                window(relative_stop - 1),
            ]
        } else {
            (relative_start..relative_stop).map(window).collect()
        };

        if let Some(last) = windows.last_mut() {
            if last.end > frame_count {
                last.end = relative_stop;
            }
        }
        windows
    }

    /// 水平方向：左边界至多到 `width - rel`，右边界至少到 `rel`；垂直方向上下各扩 `y_abs_padding`
    pub fn pad(envelope: Envelope, frame_width: u32, config: &DetectionConfig) -> Envelope {
        let (x1, y1, x2, y2) = envelope;
        let width = i64::from(frame_width);
        let relative_x_padding = (width as f64 * config.x_rel_padding) as i64;
        let y_padding = i64::from(config.y_abs_padding);

        (
            x1.min(width - relative_x_padding),
            y1 - y_padding,
            x2.max(relative_x_padding),
            y2 + y_padding,
        )
    }

    /// 搜索区域内的坐标平移回完整画面
    pub fn reposition(envelope: Envelope, search_area: Option<SubtitleArea>) -> Envelope {
        let Some(area) = search_area else {
            return envelope;
        };
        let (dx, dy) = (i64::from(area.x1), i64::from(area.y1));
        let (x1, y1, x2, y2) = envelope;
        (x1 + dx, y1 + dy, x2 + dx, y2 + dy)
    }

    /// 检测字幕区域。`Completed(None)` 表示没有任何检测框，调用方应退回默认区域
    pub fn detect(
        &self,
        video: &Path,
        cancel: &CancellationToken,
    ) -> Result<StageOutcome<Option<SubtitleArea>>, ExtractError> {
        if !video.is_file() {
            error!("Video file: {:?} ...could not be found!", video.file_name());
            return Err(ExtractError::VideoNotFound(video.to_path_buf()));
        }
        if cancel.is_cancelled() {
            warn!("Sub area detection interrupted!");
            return Ok(StageOutcome::Cancelled);
        }

        let cache = CacheDir::reset(&self.config.cache_dir)?;
        let frame_dir = cache.detection_frames_dir()?;
        info!("🔍 Detecting sub area. Video name: {:?}", video.file_name());

        let details = self.video.details(video)?;
        let search_area = self.config.detection.use_search_area.then(|| {
            info!("Default sub area is being used as search area.");
            SubtitleArea::default_for(details.width, details.height, self.config.default_area_height_ratio)
        });

        if self.sample_windows(video, &details, search_area, &frame_dir, cancel)? {
            return Ok(StageOutcome::Cancelled);
        }

        let area = self
            .union_of_boxes(&frame_dir)?
            .map(|envelope| Self::pad(envelope, details.width, &self.config.detection))
            .map(|envelope| Self::reposition(envelope, search_area))
            .and_then(|envelope| clamp_to_frame(envelope, &details));

        match area {
            Some(area) => info!("✅ New sub area = {area}"),
            None => info!("No subtitle text detected, default sub area will be used"),
        }
        Ok(StageOutcome::Completed(area))
    }

    /// 逐个窗口抽帧；返回 true 表示中途被取消
    fn sample_windows(
        &self,
        video: &Path,
        details: &VideoDetails,
        search_area: Option<SubtitleArea>,
        frame_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<bool, ExtractError> {
        let windows = Self::key_windows(details.frame_count, &self.config.detection);
        let relative_start = (details.frame_count as f64 * self.config.detection.split_start) as u64;
        let relative_stop = (details.frame_count as f64 * self.config.detection.split_stop) as u64;
        info!(
            "Split Start = {}, Split Stop = {}",
            frame_to_timecode(relative_start, details.fps),
            frame_to_timecode(relative_stop, details.fps)
        );
        debug!("Detection windows: {:?}", windows);

        let frames_config = FrameExtractionConfig {
            stride: (details.fps.round() as u64).max(1),
            ..self.config.frames.clone()
        };
        let sampler = FrameSampler::new(self.video, &frames_config);

        for window in windows {
            let request = SampleRequest {
                video,
                output_dir: frame_dir,
                area: search_area,
                start_frame: window.start,
                stop_frame: window.end,
                stride: frames_config.stride,
            };
            if sampler.sample(&request, cancel)?.is_cancelled() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// 对所有检测帧只做检测，保留置信度高于阈值的框，返回它们的并集外接矩形
    fn union_of_boxes(&self, frame_dir: &Path) -> Result<Option<Envelope>, ExtractError> {
        let mut engine = self.ocr.create_engine(&OcrOptions {
            language: self.config.text.language.clone(),
            threads: self.config.text.engine_threads,
        })?;
        let drop_score = self.config.text.drop_score;

        let mut union: Option<Envelope> = None;
        let mut kept = 0usize;
        for (_, path) in cache::list_artifacts(frame_dir, cache::FRAME_EXTENSION)? {
            let image = image::open(&path)?.to_rgb8();
            for detection in engine.detect(&image)? {
                if detection.score <= drop_score {
                    continue;
                }
                kept += 1;
                let (x1, y1, x2, y2) = detection.envelope();
                union = Some(match union {
                    Some((ux1, uy1, ux2, uy2)) => (ux1.min(x1), uy1.min(y1), ux2.max(x2), uy2.max(y2)),
                    None => (x1, y1, x2, y2),
                });
            }
        }

        debug!("{kept} detection box(es) kept, envelope {:?}", union);
        Ok(union)
    }
}

fn clamp_to_frame(envelope: Envelope, details: &VideoDetails) -> Option<SubtitleArea> {
    let (x1, y1, x2, y2) = envelope;
    let clamp_x = |v: i64| v.clamp(0, i64::from(details.width)) as u32;
    let clamp_y = |v: i64| v.clamp(0, i64::from(details.height)) as u32;
    SubtitleArea::new(clamp_x(x1), clamp_y(y1), clamp_x(x2), clamp_y(y2))
        .clamped(details.width, details.height)
}
