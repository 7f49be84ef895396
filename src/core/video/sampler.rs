//! 抽帧器 - 把帧区间切成连续分块，多 worker 并行解码、裁剪并写出帧图像

use crate::core::area::SubtitleArea;
use crate::core::cache;
use crate::core::cancel::{CancellationToken, StageOutcome};
use crate::core::config::FrameExtractionConfig;
use crate::core::error::{ExtractError, Stage};
use crate::core::video::frame::{DecodedFrame, VideoBackend, VideoError};
use image::ImageOutputFormat;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::io::Cursor;
use std::path::Path;

const JPEG_QUALITY: u8 = 95;

/// 半开区间 `[start, end)` 的帧分块
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameChunk {
    pub start: u64,
    pub end: u64,
}

/// 一次抽帧任务
#[derive(Debug, Clone, Copy)]
pub struct SampleRequest<'a> {
    pub video: &'a Path,
    pub output_dir: &'a Path,
    pub area: Option<SubtitleArea>,
    pub start_frame: u64,
    pub stop_frame: u64,
    pub stride: u64,
}

/// 抽帧统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleStats {
    pub chunks: usize,
    pub written_frames: u64,
}

pub struct FrameSampler<'a> {
    backend: &'a dyn VideoBackend,
    config: &'a FrameExtractionConfig,
}

impl<'a> FrameSampler<'a> {
    pub fn new(backend: &'a dyn VideoBackend, config: &'a FrameExtractionConfig) -> Self {
        Self { backend, config }
    }

    /// 把 `[start, stop)` 切成连续分块；分块大小不小于总帧数时缩为 `frame_count - 1`
    pub fn partition(start: u64, stop: u64, chunk_size: u64, frame_count: u64) -> Vec<FrameChunk> {
        let stop = stop.min(frame_count);
        if start >= stop {
            return Vec::new();
        }

        let chunk_size = if frame_count > chunk_size {
            chunk_size
        } else {
            frame_count.saturating_sub(1)
        }
        .max(1);

        let mut chunks: Vec<FrameChunk> = (start..stop)
            .step_by(chunk_size as usize)
            .map(|s| FrameChunk {
                start: s,
                end: s + chunk_size,
            })
            .collect();
        if let Some(last) = chunks.last_mut() {
            last.end = stop;
        }
        chunks
    }

    /// 完整抽帧：开始前检查取消标志，一旦开始就跑完所有分块
    pub fn sample(
        &self,
        request: &SampleRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<StageOutcome<SampleStats>, ExtractError> {
        let prefix = "Frame Extraction";
        if cancel.is_cancelled() {
            warn!("{prefix} process interrupted!");
            return Ok(StageOutcome::Cancelled);
        }

        let details = self.backend.details(request.video)?;
        if details.frame_count < 1 {
            return Err(VideoError::NoFrames(request.video.display().to_string()).into());
        }

        let chunks = Self::partition(
            request.start_frame,
            request.stop_frame,
            self.config.chunk_size,
            details.frame_count,
        );
        info!(
            "🎬 Starting {prefix}: {} chunk(s) over frames {}..{}, {} worker(s)",
            chunks.len(),
            request.start_frame,
            request.stop_frame.min(details.frame_count),
            self.config.workers
        );

        let written_frames = self.run_chunks(request, &chunks)?;

        info!("✅ {prefix} done! {} frame(s) written", written_frames);
        Ok(StageOutcome::Completed(SampleStats {
            chunks: chunks.len(),
            written_frames,
        }))
    }

    /// 在有界线程池中处理分块，第一个失败的分块终止整个阶段
    pub fn run_chunks(
        &self,
        request: &SampleRequest<'_>,
        chunks: &[FrameChunk],
    ) -> Result<u64, ExtractError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|e| ExtractError::WorkerFailure {
                stage: Stage::FrameExtraction,
                reason: e.to_string(),
            })?;

        pool.install(|| {
            chunks
                .par_iter()
                .map(|chunk| self.extract_chunk(request, *chunk))
                .try_reduce(|| 0, |a, b| Ok(a + b))
        })
    }

    /// 单个分块：独立打开解码句柄，seek 到起点后顺序解码
    pub fn extract_chunk(
        &self,
        request: &SampleRequest<'_>,
        chunk: FrameChunk,
    ) -> Result<u64, ExtractError> {
        let stride = request.stride.max(1);
        let mut handle = self.backend.open(request.video)?;
        handle.seek(chunk.start)?;

        let mut frame_no = chunk.start;
        let mut empty_reads = 0u32;
        let mut written = 0u64;

        while frame_no < chunk.end {
            let Some(decoded) = handle.read()? else {
                empty_reads += 1;
                if empty_reads > self.config.max_read_retries {
                    warn!(
                        "⚠️ Chunk {}..{} gave up at frame {} after {} empty reads",
                        chunk.start, chunk.end, frame_no, empty_reads
                    );
                    break;
                }
                continue;
            };
            empty_reads = 0;

            if frame_no % stride == 0 {
                Self::write_frame(&decoded, request.area, request.output_dir)?;
                written += 1;
            }
            frame_no += 1;
        }

        debug!(
            "Chunk {}..{} done, {} frame(s) written",
            chunk.start, chunk.end, written
        );
        Ok(written)
    }

    fn write_frame(
        decoded: &DecodedFrame,
        area: Option<SubtitleArea>,
        output_dir: &Path,
    ) -> Result<(), ExtractError> {
        let cropped;
        let image = match area {
            Some(area) => {
                cropped = area.crop(&decoded.image);
                &cropped
            }
            None => &decoded.image,
        };

        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageOutputFormat::Jpeg(JPEG_QUALITY))?;

        let path = output_dir.join(cache::frame_file_name(decoded.timestamp_ms));
        std::fs::write(path, buffer.into_inner())?;
        Ok(())
    }
}
