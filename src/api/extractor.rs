//! 字幕提取器

use crate::core::area::{SubtitleArea, SubtitleAreaDetector};
use crate::core::cache::{self, CacheDir};
use crate::core::cancel::{CancellationToken, StageOutcome};
use crate::core::config::ExtractorConfig;
use crate::core::error::{ConfigError, ExtractError, Stage};
use crate::core::ocr::{OcrBackend, TextExtractor};
use crate::core::subtitle::{save_subtitle, SubtitleSynthesizer};
use crate::core::video::{frame_to_timecode, FrameSampler, SampleRequest, VideoBackend};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// 一次提取的结果
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    /// 字幕文件已写出
    Written(PathBuf),
    /// 过滤后没有剩下任何字幕条目，不写文件
    NoSubtitles,
    Cancelled,
}

/// 硬字幕提取器 - 抽帧、OCR、合成 SRT
///
/// ```ignore
/// let extractor = SubtitleExtractor::create(config, video_backend, ocr_backend)?;
/// let area = extractor.detect_sub_area(&video)?;
/// let outcome = extractor.run_extraction(&video, None, None, None)?;
/// ```
pub struct SubtitleExtractor {
    config: ExtractorConfig,
    video: Arc<dyn VideoBackend>,
    ocr: Arc<dyn OcrBackend>,
    cancel: CancellationToken,
}

impl SubtitleExtractor {
    pub fn create(
        config: ExtractorConfig,
        video: Arc<dyn VideoBackend>,
        ocr: Arc<dyn OcrBackend>,
    ) -> Result<Self, ExtractError> {
        config.validate()?;
        info!("🎬 SubtitleExtractor: created, cache at {:?}", config.cache_dir);
        Ok(Self {
            config,
            video,
            ocr,
            cancel: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// 共享的取消令牌，可交给其他线程
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 使用外部传入的取消令牌，便于宿主在多个组件间共享
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel(&self) {
        self.cancel.cancel()
    }

    /// 开始新一轮处理前重新允许运行，清除上一轮留下的取消请求
    pub fn start(&self) {
        self.cancel.reset()
    }

    /// 自动检测字幕区域；`Completed(None)` 表示未检测到文字
    pub fn detect_sub_area(
        &self,
        video: &Path,
    ) -> Result<StageOutcome<Option<SubtitleArea>>, ExtractError> {
        SubtitleAreaDetector::new(self.video.as_ref(), self.ocr.as_ref(), &self.config)
            .detect(video, &self.cancel)
    }

    /// 完整提取流程。`area` 为空时使用默认字幕区域；帧范围缺省为整个视频
    pub fn run_extraction(
        &self,
        video: &Path,
        area: Option<SubtitleArea>,
        start_frame: Option<u64>,
        stop_frame: Option<u64>,
    ) -> Result<ExtractionOutcome, ExtractError> {
        if !video.is_file() {
            error!("Video file: {:?} ...could not be found!", video.file_name());
            return Err(ExtractError::VideoNotFound(video.to_path_buf()));
        }

        let started = Instant::now();
        let outcome = self.extract(video, area, start_frame, stop_frame);
        let elapsed = started.elapsed().as_secs();

        match &outcome {
            Ok(ExtractionOutcome::Written(path)) => {
                info!("✅ Subtitle Extraction Done! Total time: {elapsed}s, saved to {:?}", path)
            }
            Ok(ExtractionOutcome::NoSubtitles) => {
                info!("Subtitle Extraction Done! Total time: {elapsed}s, no subtitle lines survived")
            }
            Ok(ExtractionOutcome::Cancelled) => warn!("Subtitle Extraction cancelled after {elapsed}s"),
            Err(e) => error!("❌ Subtitle Extraction failed after {elapsed}s: {e}"),
        }
        outcome
    }

    fn extract(
        &self,
        video: &Path,
        area: Option<SubtitleArea>,
        start_frame: Option<u64>,
        stop_frame: Option<u64>,
    ) -> Result<ExtractionOutcome, ExtractError> {
        let details = self.video.details(video)?;
        let area = match area {
            Some(area) => area
                .clamped(details.width, details.height)
                .ok_or_else(|| ConfigError::Invalid {
                    field: "sub_area",
                    reason: format!("{area} lies outside {}x{}", details.width, details.height),
                })?,
            None => SubtitleArea::default_for(
                details.width,
                details.height,
                self.config.default_area_height_ratio,
            ),
        };
        let start_frame = start_frame.unwrap_or(0);
        let stop_frame = stop_frame.unwrap_or(details.frame_count).min(details.frame_count);
        if start_frame >= stop_frame {
            return Err(ConfigError::Invalid {
                field: "frame_range",
                reason: format!(
                    "start frame {start_frame} is not before stop frame {stop_frame} (video has {} frames)",
                    details.frame_count
                ),
            }
            .into());
        }

        // 所有退出路径上都会随 guard 析构删除
        let cache = CacheDir::reset(&self.config.cache_dir)?;
        let frames_dir = cache.frames_dir()?;
        let texts_dir = cache.texts_dir()?;

        info!(
            "File Path: {:?}\nFrame Total: {}, Frame Rate: {}\nResolution: {} X {}\nSubtitle Area: {}\nStart Frame: {} ({}), Stop Frame: {} ({})",
            video,
            details.frame_count,
            details.fps,
            details.width,
            details.height,
            area,
            start_frame,
            frame_to_timecode(start_frame, details.fps),
            stop_frame,
            frame_to_timecode(stop_frame, details.fps)
        );

        let request = SampleRequest {
            video,
            output_dir: &frames_dir,
            area: Some(area),
            start_frame,
            stop_frame,
            stride: self.config.frames.stride,
        };
        let sampled = FrameSampler::new(self.video.as_ref(), &self.config.frames)
            .sample(&request, &self.cancel)?;
        if sampled.is_cancelled() {
            return Ok(ExtractionOutcome::Cancelled);
        }

        let extracted = TextExtractor::new(self.ocr.as_ref(), &self.config.text)
            .extract(&frames_dir, &texts_dir, &self.cancel)?;
        if extracted.is_cancelled() {
            return Ok(ExtractionOutcome::Cancelled);
        }
        Self::check_counts(&frames_dir, &texts_dir)?;

        if self.cancel.is_cancelled() {
            warn!("Subtitle generation process interrupted!");
            return Ok(ExtractionOutcome::Cancelled);
        }

        info!("📝 Generating subtitle...");
        let records = cache::load_frame_texts(&texts_dir)?;
        let entries = SubtitleSynthesizer::new(&self.config.subtitle).synthesize(&records);
        info!("Subtitle generated! {} entries", entries.len());

        Ok(match save_subtitle(video, &entries)? {
            Some(path) => ExtractionOutcome::Written(path),
            None => ExtractionOutcome::NoSubtitles,
        })
    }

    /// 每个帧图像都必须有对应的文本文件
    fn check_counts(frames_dir: &Path, texts_dir: &Path) -> Result<(), ExtractError> {
        let frames = cache::list_artifacts(frames_dir, cache::FRAME_EXTENSION)?.len();
        let texts = cache::list_artifacts(texts_dir, cache::TEXT_EXTENSION)?.len();
        if frames != texts {
            return Err(ExtractError::WorkerFailure {
                stage: Stage::TextExtraction,
                reason: format!("{frames} frame(s) but {texts} text file(s)"),
            });
        }
        Ok(())
    }
}

impl Drop for SubtitleExtractor {
    fn drop(&mut self) {
        info!("🗑️ SubtitleExtractor: released");
    }
}
