//! 文字提取 - 把帧图像分批交给 OCR worker，每帧写出一个文本文件

use crate::core::cache;
use crate::core::cancel::{CancellationToken, StageOutcome};
use crate::core::config::TextExtractionConfig;
use crate::core::error::{ExtractError, Stage};
use crate::core::ocr::engine::{join_accepted, OcrBackend, OcrEngine, OcrOptions};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub struct TextExtractor<'a> {
    backend: &'a dyn OcrBackend,
    config: &'a TextExtractionConfig,
}

impl<'a> TextExtractor<'a> {
    pub fn new(backend: &'a dyn OcrBackend, config: &'a TextExtractionConfig) -> Self {
        Self { backend, config }
    }

    fn options(&self) -> OcrOptions {
        OcrOptions {
            language: self.config.language.clone(),
            threads: self.config.engine_threads,
        }
    }

    /// 识别 `frames_dir` 下所有帧，文本写入 `texts_dir`，返回处理的帧数
    pub fn extract(
        &self,
        frames_dir: &Path,
        texts_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<StageOutcome<usize>, ExtractError> {
        let prefix = "Text Extraction";
        if cancel.is_cancelled() {
            warn!("{prefix} process interrupted!");
            return Ok(StageOutcome::Cancelled);
        }

        let files: Vec<PathBuf> = cache::list_artifacts(frames_dir, cache::FRAME_EXTENSION)?
            .into_iter()
            .map(|(_, path)| path)
            .collect();
        let batches: Vec<&[PathBuf]> = files.chunks(self.config.batch_size.max(1)).collect();
        info!(
            "🔤 Starting {prefix}: {} frame(s) in {} batch(es), {} worker(s)",
            files.len(),
            batches.len(),
            self.config.workers
        );
        if batches.is_empty() {
            return Ok(StageOutcome::Completed(0));
        }

        let workers = self.config.workers.clamp(1, batches.len().max(1));
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ExtractError::WorkerFailure {
                stage: Stage::TextExtraction,
                reason: e.to_string(),
            })?;

        // worker 按下标领取批次，出错后其余 worker 不再领取新批次
        let next_batch = AtomicUsize::new(0);
        let failed = AtomicBool::new(false);
        let processed = pool.install(|| {
            (0..workers)
                .into_par_iter()
                .map(|_| {
                    let result = self.run_worker(&batches, &next_batch, &failed, texts_dir);
                    if result.is_err() {
                        failed.store(true, Ordering::SeqCst);
                    }
                    result
                })
                .try_reduce(|| 0, |a, b| Ok(a + b))
        })?;

        info!("✅ {prefix} done! {processed} frame(s) processed");
        Ok(StageOutcome::Completed(processed))
    }

    /// 一个 worker：引擎只创建一次，依次处理领到的批次
    fn run_worker(
        &self,
        batches: &[&[PathBuf]],
        next_batch: &AtomicUsize,
        failed: &AtomicBool,
        texts_dir: &Path,
    ) -> Result<usize, ExtractError> {
        let mut engine: Option<Box<dyn OcrEngine>> = None;
        let mut processed = 0;

        while !failed.load(Ordering::SeqCst) {
            let index = next_batch.fetch_add(1, Ordering::SeqCst);
            let Some(batch) = batches.get(index) else {
                break;
            };
            if engine.is_none() {
                engine = Some(self.backend.create_engine(&self.options())?);
            }
            if let Some(engine) = engine.as_mut() {
                processed += self.extract_batch(&mut **engine, batch, texts_dir)?;
            }
        }
        Ok(processed)
    }

    /// 用给定引擎顺序识别一个批次
    pub fn extract_batch(
        &self,
        engine: &mut dyn OcrEngine,
        batch: &[PathBuf],
        texts_dir: &Path,
    ) -> Result<usize, ExtractError> {
        let separator = self.config.line_separator();

        for frame_path in batch {
            let timestamp_ms = cache::parse_timestamp(frame_path)?;
            let image = image::open(frame_path)?.to_rgb8();
            let results = engine.recognize(&image)?;
            let text = join_accepted(&results, self.config.drop_score, separator);

            std::fs::write(texts_dir.join(cache::text_file_name(timestamp_ms)), text)?;
        }

        debug!("Batch of {} frame(s) done", batch.len());
        Ok(batch.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ocr::engine::OcrError;
    use crate::core::ocr::mock::MockOcr;
    use image::{Rgb, RgbImage};
    use std::sync::Arc;

    /// 记录引擎创建次数
    struct CountingOcr {
        inner: MockOcr,
        created: Arc<AtomicUsize>,
    }

    impl OcrBackend for CountingOcr {
        fn create_engine(&self, options: &OcrOptions) -> Result<Box<dyn OcrEngine>, OcrError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            self.inner.create_engine(options)
        }
    }

    fn write_band_frame(dir: &Path, timestamp_ms: f64, band_width: Option<u32>) {
        let mut image = RgbImage::from_pixel(200, 40, Rgb([20, 20, 20]));
        if let Some(w) = band_width {
            for y in 10..30 {
                for x in 10..10 + w {
                    image.put_pixel(x, y, Rgb([255, 255, 255]));
                }
            }
        }
        image
            .save(dir.join(cache::frame_file_name(timestamp_ms)))
            .unwrap();
    }

    fn config(batch_size: usize) -> TextExtractionConfig {
        TextExtractionConfig {
            batch_size,
            workers: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_extract_writes_one_text_per_frame() {
        let frames = tempfile::tempdir().unwrap();
        let texts = tempfile::tempdir().unwrap();
        write_band_frame(frames.path(), 0.0, Some(60));
        write_band_frame(frames.path(), 66.66666666666667, Some(60));
        write_band_frame(frames.path(), 133.33333333333334, None);
        write_band_frame(frames.path(), 200.0, Some(120));

        let ocr = MockOcr::new()
            .with_line(60, "星辰之力")
            .with_line(120, "竟然还蕴含着星辰之力");
        let cfg = config(3);
        let extractor = TextExtractor::new(&ocr, &cfg);

        let outcome = extractor
            .extract(frames.path(), texts.path(), &CancellationToken::new())
            .unwrap();
        assert_eq!(outcome, StageOutcome::Completed(4));

        let loaded = cache::load_frame_texts(texts.path()).unwrap();
        let texts: Vec<&str> = loaded.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["星辰之力", "星辰之力", "", "竟然还蕴含着星辰之力"]);
        assert_eq!(loaded[1].timestamp_ms, 66.66666666666667);
    }

    #[test]
    fn test_low_score_text_is_dropped() {
        let frames = tempfile::tempdir().unwrap();
        let texts = tempfile::tempdir().unwrap();
        write_band_frame(frames.path(), 0.0, Some(60));

        let ocr = MockOcr::new().with_line(60, "模糊").with_score(0.5);
        let cfg = config(10);
        TextExtractor::new(&ocr, &cfg)
            .extract(frames.path(), texts.path(), &CancellationToken::new())
            .unwrap();

        let loaded = cache::load_frame_texts(texts.path()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].text, "");
    }

    #[test]
    fn test_cancelled_before_submission() {
        let frames = tempfile::tempdir().unwrap();
        let texts = tempfile::tempdir().unwrap();
        write_band_frame(frames.path(), 0.0, Some(60));

        let ocr = MockOcr::new();
        let cfg = config(10);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = TextExtractor::new(&ocr, &cfg)
            .extract(frames.path(), texts.path(), &cancel)
            .unwrap();
        assert!(outcome.is_cancelled());
        assert_eq!(std::fs::read_dir(texts.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_engine_failure_is_surfaced() {
        let frames = tempfile::tempdir().unwrap();
        let texts = tempfile::tempdir().unwrap();
        for i in 0..5 {
            write_band_frame(frames.path(), i as f64 * 100.0, Some(60));
        }

        let ocr = MockOcr::new().failing_recognition();
        let cfg = config(2);
        let err = TextExtractor::new(&ocr, &cfg)
            .extract(frames.path(), texts.path(), &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, ExtractError::Ocr(OcrError::Inference(_))));
    }

    #[test]
    fn test_one_engine_per_worker() {
        let frames = tempfile::tempdir().unwrap();
        let texts = tempfile::tempdir().unwrap();
        for i in 0..40 {
            write_band_frame(frames.path(), i as f64 * 100.0, Some(60));
        }

        let created = Arc::new(AtomicUsize::new(0));
        let ocr = CountingOcr {
            inner: MockOcr::new().with_line(60, "字幕"),
            created: Arc::clone(&created),
        };
        let cfg = config(2);
        let outcome = TextExtractor::new(&ocr, &cfg)
            .extract(frames.path(), texts.path(), &CancellationToken::new())
            .unwrap();

        assert_eq!(outcome, StageOutcome::Completed(40));
        let engines = created.load(Ordering::SeqCst);
        assert!(engines >= 1 && engines <= cfg.workers, "{engines} engine(s) created");
        assert_eq!(cache::load_frame_texts(texts.path()).unwrap().len(), 40);
    }

    #[test]
    fn test_empty_frame_dir() {
        let frames = tempfile::tempdir().unwrap();
        let texts = tempfile::tempdir().unwrap();
        let cfg = config(10);
        let outcome = TextExtractor::new(&MockOcr::new(), &cfg)
            .extract(frames.path(), texts.path(), &CancellationToken::new())
            .unwrap();
        assert_eq!(outcome, StageOutcome::Completed(0));
    }
}
