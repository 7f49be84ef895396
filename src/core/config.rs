//! 提取配置 - 一次构造、显式传递的不可变值对象

use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 抽帧阶段配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameExtractionConfig {
    /// 每隔多少帧写出一帧
    pub stride: u64,
    /// 每个 worker 分到的连续帧数
    pub chunk_size: u64,
    pub workers: usize,
    /// 解码器连续读不到数据的上限，超过后放弃当前分块
    pub max_read_retries: u32,
}

impl Default for FrameExtractionConfig {
    fn default() -> Self {
        Self {
            stride: 2,
            chunk_size: 250,
            workers: num_cpus::get(),
            max_read_retries: 500,
        }
    }
}

/// OCR 文字提取阶段配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextExtractionConfig {
    pub batch_size: usize,
    pub workers: usize,
    /// OCR 识别语言
    pub language: String,
    /// 单个引擎实例内部线程数
    pub engine_threads: usize,
    /// 置信度不高于该值的识别结果被丢弃
    pub drop_score: f32,
    /// true 时多行文本用换行连接，否则用空格
    pub line_break: bool,
}

impl TextExtractionConfig {
    pub fn line_separator(&self) -> &'static str {
        if self.line_break {
            "\n"
        } else {
            " "
        }
    }
}

impl Default for TextExtractionConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            workers: 6,
            language: "ch".to_string(),
            engine_threads: 8,
            drop_score: 0.7,
            line_break: false,
        }
    }
}

/// 字幕合成阶段配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleConfig {
    pub similarity_threshold: f64,
    pub min_consecutive_duration_ms: f64,
    pub max_consecutive_short_durations: usize,
    pub min_duration_ms: f64,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            min_consecutive_duration_ms: 500.0,
            max_consecutive_short_durations: 4,
            min_duration_ms: 120.0,
        }
    }
}

/// 字幕区域自动检测配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// 采样窗口起点（占总时长比例）
    pub split_start: f64,
    /// 采样窗口终点（占总时长比例）
    pub split_stop: f64,
    /// 每个窗口覆盖的帧数
    pub window_frames: u64,
    /// 水平内边距，相对画面宽度
    pub x_rel_padding: f64,
    /// 垂直内边距，绝对像素
    pub y_abs_padding: u32,
    /// 只在默认字幕区域内搜索
    pub use_search_area: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            split_start: 0.25,
            split_stop: 0.5,
            window_frames: 200,
            x_rel_padding: 0.85,
            y_abs_padding: 15,
            use_search_area: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub frames: FrameExtractionConfig,
    pub text: TextExtractionConfig,
    pub subtitle: SubtitleConfig,
    pub detection: DetectionConfig,
    /// 默认字幕区域上边界占画面高度的比例
    pub default_area_height_ratio: f64,
    pub cache_dir: PathBuf,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            frames: FrameExtractionConfig::default(),
            text: TextExtractionConfig::default(),
            subtitle: SubtitleConfig::default(),
            detection: DetectionConfig::default(),
            default_area_height_ratio: 0.75,
            cache_dir: PathBuf::from("output"),
        }
    }
}

impl ExtractorConfig {
    /// 快速预览：更稀疏的抽帧和更短的检测窗口
    pub fn for_fast_preview() -> Self {
        let base = Self::default();
        Self {
            frames: FrameExtractionConfig {
                stride: 6,
                ..base.frames
            },
            detection: DetectionConfig {
                window_frames: 90,
                ..base.detection
            },
            ..base
        }
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid {
                field,
                reason: reason.into(),
            }
        }
        fn unit_interval(field: &'static str, value: f64) -> Result<(), ConfigError> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(invalid(field, format!("{value} is outside [0, 1]")))
            }
        }

        if self.frames.stride == 0 {
            return Err(invalid("frames.stride", "must be at least 1"));
        }
        if self.frames.chunk_size == 0 {
            return Err(invalid("frames.chunk_size", "must be at least 1"));
        }
        if self.frames.workers == 0 {
            return Err(invalid("frames.workers", "must be at least 1"));
        }
        if self.text.batch_size == 0 {
            return Err(invalid("text.batch_size", "must be at least 1"));
        }
        if self.text.workers == 0 {
            return Err(invalid("text.workers", "must be at least 1"));
        }
        unit_interval("text.drop_score", f64::from(self.text.drop_score))?;
        unit_interval("subtitle.similarity_threshold", self.subtitle.similarity_threshold)?;
        if self.subtitle.min_duration_ms < 0.0 {
            return Err(invalid("subtitle.min_duration_ms", "must not be negative"));
        }
        if self.subtitle.min_consecutive_duration_ms < 0.0 {
            return Err(invalid(
                "subtitle.min_consecutive_duration_ms",
                "must not be negative",
            ));
        }
        unit_interval("detection.split_start", self.detection.split_start)?;
        unit_interval("detection.split_stop", self.detection.split_stop)?;
        if self.detection.split_start >= self.detection.split_stop {
            return Err(invalid(
                "detection.split_start",
                "must be smaller than detection.split_stop",
            ));
        }
        if self.detection.window_frames == 0 {
            return Err(invalid("detection.window_frames", "must be at least 1"));
        }
        unit_interval("detection.x_rel_padding", self.detection.x_rel_padding)?;
        unit_interval("default_area_height_ratio", self.default_area_height_ratio)?;
        Ok(())
    }
}
