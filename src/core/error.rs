use std::path::PathBuf;

use thiserror::Error;

use crate::core::ocr::OcrError;
use crate::core::video::VideoError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// 流水线阶段，用于定位 worker 失败
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FrameExtraction,
    TextExtraction,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::FrameExtraction => "frame extraction",
            Stage::TextExtraction => "text extraction",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("video file not found: {}", .0.display())]
    VideoNotFound(PathBuf),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("video error: {0}")]
    Video(#[from] VideoError),
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid cache artifact name: {}", .0.display())]
    ArtifactName(PathBuf),
    #[error("{stage} worker failed: {reason}")]
    WorkerFailure { stage: Stage, reason: String },
}
