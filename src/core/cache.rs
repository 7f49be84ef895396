//! 缓存目录与阶段间的文件交接约定
//!
//! 各阶段之间只通过文件交接，文件名就是帧的显示时间戳（毫秒）：
//! - 帧图像：`{timestamp_ms}.jpg`
//! - 识别文本：`{timestamp_ms}.txt`，UTF-8，文件缺失等同于空文本
//!
//! 时间戳在同一个视频内全局唯一，因此并行 worker 写文件无需加锁。

use crate::core::error::ExtractError;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

pub const FRAME_EXTENSION: &str = "jpg";
pub const TEXT_EXTENSION: &str = "txt";

const FRAMES_DIR: &str = "frames";
const TEXTS_DIR: &str = "extracted texts";
const DETECT_FRAMES_DIR: &str = "sub detect frames";

/// 时间戳的文件名形式：最短可往返的十进制表示，至少一位小数
pub fn timestamp_key(timestamp_ms: f64) -> String {
    format!("{timestamp_ms:?}")
}

pub fn frame_file_name(timestamp_ms: f64) -> String {
    format!("{}.{FRAME_EXTENSION}", timestamp_key(timestamp_ms))
}

pub fn text_file_name(timestamp_ms: f64) -> String {
    format!("{}.{TEXT_EXTENSION}", timestamp_key(timestamp_ms))
}

/// 从缓存文件名中解析时间戳
pub fn parse_timestamp(path: &Path) -> Result<f64, ExtractError> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.parse::<f64>().ok())
        .filter(|ts| ts.is_finite() && *ts >= 0.0)
        .ok_or_else(|| ExtractError::ArtifactName(path.to_path_buf()))
}

/// 列出目录下指定扩展名的缓存文件，按时间戳升序
pub fn list_artifacts(dir: &Path, extension: &str) -> Result<Vec<(f64, PathBuf)>, ExtractError> {
    let mut artifacts = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        artifacts.push((parse_timestamp(&path)?, path));
    }
    artifacts.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(artifacts)
}

/// 每帧的识别文本
#[derive(Debug, Clone, PartialEq)]
pub struct FrameText {
    pub timestamp_ms: f64,
    pub text: String,
}

impl FrameText {
    pub fn new(timestamp_ms: f64, text: impl Into<String>) -> Self {
        Self {
            timestamp_ms,
            text: text.into(),
        }
    }
}

/// 读取所有文本文件，按时间戳升序返回（含空文本）
pub fn load_frame_texts(dir: &Path) -> Result<Vec<FrameText>, ExtractError> {
    list_artifacts(dir, TEXT_EXTENSION)?
        .into_iter()
        .map(|(timestamp_ms, path)| {
            let text = fs::read_to_string(&path)?;
            Ok(FrameText { timestamp_ms, text })
        })
        .collect()
}

/// 独占的缓存目录：创建时清空重建，析构时删除
#[derive(Debug)]
pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    pub fn reset(root: impl Into<PathBuf>) -> Result<Self, ExtractError> {
        let root = root.into();
        if root.exists() {
            debug!("Emptying cache {:?}", root);
            fs::remove_dir_all(&root)?;
        }
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn frames_dir(&self) -> Result<PathBuf, ExtractError> {
        self.subdir(FRAMES_DIR)
    }

    pub fn texts_dir(&self) -> Result<PathBuf, ExtractError> {
        self.subdir(TEXTS_DIR)
    }

    pub fn detection_frames_dir(&self) -> Result<PathBuf, ExtractError> {
        self.subdir(DETECT_FRAMES_DIR)
    }

    fn subdir(&self, name: &str) -> Result<PathBuf, ExtractError> {
        let dir = self.root.join(name);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

impl Drop for CacheDir {
    fn drop(&mut self) {
        if self.root.exists() {
            debug!("Emptying cache {:?}", self.root);
            if let Err(e) = fs::remove_dir_all(&self.root) {
                warn!("⚠️ Failed to remove cache {:?}: {}", self.root, e);
            }
        }
    }
}
