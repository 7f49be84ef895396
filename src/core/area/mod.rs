//! 字幕区域：矩形类型与自动检测

pub mod detector;
pub mod rect;

pub use detector::{DetectionWindow, SubtitleAreaDetector};
pub use rect::SubtitleArea;
