//! 批处理队列 - 按顺序对多个视频执行区域检测或字幕提取

use crate::api::extractor::{ExtractionOutcome, SubtitleExtractor};
use crate::core::area::SubtitleArea;
use crate::core::cancel::StageOutcome;
use crate::core::error::ExtractError;
use log::{error, info, warn};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct QueuedVideo {
    pub video: PathBuf,
    pub area: Option<SubtitleArea>,
    pub start_frame: Option<u64>,
    pub stop_frame: Option<u64>,
}

impl QueuedVideo {
    pub fn new(video: impl Into<PathBuf>) -> Self {
        Self {
            video: video.into(),
            area: None,
            start_frame: None,
            stop_frame: None,
        }
    }

    pub fn with_area(mut self, area: SubtitleArea) -> Self {
        self.area = Some(area);
        self
    }

    pub fn with_frame_range(mut self, start_frame: Option<u64>, stop_frame: Option<u64>) -> Self {
        self.start_frame = start_frame;
        self.stop_frame = stop_frame;
        self
    }
}

#[derive(Debug)]
pub enum VideoResult {
    /// 区域检测结果，None 表示未检测到文字
    AreaDetected(Option<SubtitleArea>),
    Extracted(ExtractionOutcome),
    /// 队列被取消，未处理
    Skipped,
    Failed(ExtractError),
}

#[derive(Debug)]
pub struct VideoReport {
    pub video: PathBuf,
    pub result: VideoResult,
}

#[derive(Debug, Default)]
pub struct VideoQueue {
    entries: Vec<QueuedVideo>,
}

impl VideoQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: QueuedVideo) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[QueuedVideo] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 为每个视频检测字幕区域，检测到的区域写回队列。每轮开始时重置取消标志，视频之间轮询
    pub fn detect_all(&mut self, extractor: &SubtitleExtractor) -> Vec<VideoReport> {
        info!("🔍 Detecting sub areas for {} video(s)", self.entries.len());
        extractor.start();
        let cancel = extractor.cancellation_token();
        let mut reports = Vec::with_capacity(self.entries.len());

        for entry in &mut self.entries {
            let result = if cancel.is_cancelled() {
                VideoResult::Skipped
            } else {
                match extractor.detect_sub_area(&entry.video) {
                    Ok(StageOutcome::Completed(area)) => {
                        if area.is_some() {
                            entry.area = area;
                        }
                        VideoResult::AreaDetected(area)
                    }
                    Ok(StageOutcome::Cancelled) => VideoResult::Skipped,
                    Err(e) => failed(&entry.video, e),
                }
            };
            reports.push(VideoReport {
                video: entry.video.clone(),
                result,
            });
        }
        reports
    }

    /// 依次提取字幕；单个视频失败不影响后续视频。每轮开始时重置取消标志，视频之间轮询
    pub fn extract_all(&self, extractor: &SubtitleExtractor) -> Vec<VideoReport> {
        info!("🎬 Extracting subtitles for {} video(s)", self.entries.len());
        extractor.start();
        let cancel = extractor.cancellation_token();

        self.entries
            .iter()
            .map(|entry| {
                let result = if cancel.is_cancelled() {
                    warn!("Queue interrupted, skipping {:?}", entry.video.file_name());
                    VideoResult::Skipped
                } else {
                    let outcome = extractor.run_extraction(
                        &entry.video,
                        entry.area,
                        entry.start_frame,
                        entry.stop_frame,
                    );
                    match outcome {
                        Ok(ExtractionOutcome::Cancelled) => VideoResult::Skipped,
                        Ok(outcome) => VideoResult::Extracted(outcome),
                        Err(e) => failed(&entry.video, e),
                    }
                };
                VideoReport {
                    video: entry.video.clone(),
                    result,
                }
            })
            .collect()
    }
}

fn failed(video: &Path, e: ExtractError) -> VideoResult {
    error!("❌ {:?} failed: {}", video.file_name(), e);
    VideoResult::Failed(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cancel::CancellationToken;
    use crate::core::config::ExtractorConfig;
    use crate::core::ocr::MockOcr;
    use crate::core::video::{SyntheticVideo, VideoBackend, VideoDetails, VideoError, VideoHandle};
    use std::fs;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn extractor(dir: &Path) -> SubtitleExtractor {
        let mut config = ExtractorConfig::default().with_cache_dir(dir.join("output"));
        config.frames.workers = 2;
        config.text.workers = 2;
        let video = SyntheticVideo::new(30.0, 300, 160, 90)
            .with_subtitle(0, 150, SubtitleArea::new(40, 72, 100, 84));
        let ocr = MockOcr::new().with_line(60, "队列字幕");
        SubtitleExtractor::create(config, Arc::new(video), Arc::new(ocr)).unwrap()
    }

    #[test]
    fn test_failure_does_not_stop_queue() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.mp4");
        fs::write(&good, b"").unwrap();

        let mut queue = VideoQueue::new();
        queue.push(QueuedVideo::new(dir.path().join("missing.mp4")));
        queue.push(QueuedVideo::new(&good));

        let reports = queue.extract_all(&extractor(dir.path()));
        assert_eq!(reports.len(), 2);
        assert!(matches!(
            reports[0].result,
            VideoResult::Failed(ExtractError::VideoNotFound(_))
        ));
        let VideoResult::Extracted(ExtractionOutcome::Written(path)) = &reports[1].result else {
            panic!("unexpected result {:?}", reports[1].result);
        };
        assert_eq!(path, &dir.path().join("good.srt"));
        assert!(fs::read_to_string(path).unwrap().contains("队列字幕"));
    }

    #[test]
    fn test_detect_all_stores_area() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        fs::write(&video, b"").unwrap();

        let mut queue = VideoQueue::new();
        queue.push(QueuedVideo::new(&video));
        let reports = queue.detect_all(&extractor(dir.path()));

        let VideoResult::AreaDetected(Some(area)) = &reports[0].result else {
            panic!("unexpected result {:?}", reports[0].result);
        };
        assert_eq!(queue.entries()[0].area, Some(*area));
        assert!(area.y1 < 72 && area.y2 > 84);
    }

    /// 第一次读取视频信息时请求取消，相当于用户在第一个视频处理中途点了取消
    struct CancelDuringFirstVideo {
        inner: SyntheticVideo,
        cancel: CancellationToken,
        fired: AtomicBool,
    }

    impl VideoBackend for CancelDuringFirstVideo {
        fn details(&self, path: &Path) -> Result<VideoDetails, VideoError> {
            if !self.fired.swap(true, Ordering::SeqCst) {
                self.cancel.cancel();
            }
            self.inner.details(path)
        }

        fn open(&self, path: &Path) -> Result<Box<dyn VideoHandle>, VideoError> {
            self.inner.open(path)
        }
    }

    #[test]
    fn test_cancelled_round_skips_rest_and_next_round_runs() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        fs::write(&video, b"").unwrap();

        let mut config = ExtractorConfig::default().with_cache_dir(dir.path().join("output"));
        config.frames.workers = 2;
        config.text.workers = 2;
        let cancel = CancellationToken::new();
        let backend = CancelDuringFirstVideo {
            inner: SyntheticVideo::new(30.0, 300, 160, 90)
                .with_subtitle(0, 150, SubtitleArea::new(40, 72, 100, 84)),
            cancel: cancel.clone(),
            fired: AtomicBool::new(false),
        };
        let ocr = MockOcr::new().with_line(60, "队列字幕");
        let ex = SubtitleExtractor::create(config, Arc::new(backend), Arc::new(ocr))
            .unwrap()
            .with_cancellation(cancel);

        let mut queue = VideoQueue::new();
        queue.push(QueuedVideo::new(&video).with_frame_range(Some(0), Some(60)));
        queue.push(QueuedVideo::new(&video));

        let first = queue.extract_all(&ex);
        assert!(first.iter().all(|r| matches!(r.result, VideoResult::Skipped)));
        assert!(!dir.path().join("clip.srt").exists());

        let second = queue.extract_all(&ex);
        assert!(second
            .iter()
            .all(|r| matches!(r.result, VideoResult::Extracted(ExtractionOutcome::Written(_)))));
        assert!(dir.path().join("clip.srt").exists());
        assert!(dir.path().join("clip (1).srt").exists());
    }

    #[test]
    fn test_cancel_before_round_is_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        fs::write(&video, b"").unwrap();

        let mut queue = VideoQueue::new();
        queue.push(QueuedVideo::new(&video));
        let ex = extractor(dir.path());
        ex.cancel();

        let reports = queue.detect_all(&ex);
        assert!(matches!(reports[0].result, VideoResult::AreaDetected(Some(_))));
    }
}
