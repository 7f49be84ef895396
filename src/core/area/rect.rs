use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};

/// 字幕区域，完整画面中的绝对像素坐标 `(x1, y1)` 左上、`(x2, y2)` 右下
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleArea {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl SubtitleArea {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// 默认字幕区域：画面底部，上边界为 `height * height_ratio`
    pub fn default_for(width: u32, height: u32, height_ratio: f64) -> Self {
        let y1 = (f64::from(height) * height_ratio) as u32;
        Self::new(0, y1.min(height.saturating_sub(1)), width, height)
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    /// `0 <= x1 < x2 <= width` 且 `0 <= y1 < y2 <= height`
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x1 < self.x2 && self.x2 <= width && self.y1 < self.y2 && self.y2 <= height
    }

    /// 裁剪到画面范围内；裁完为空则返回 None
    pub fn clamped(&self, width: u32, height: u32) -> Option<Self> {
        let area = Self::new(
            self.x1.min(width),
            self.y1.min(height),
            self.x2.min(width),
            self.y2.min(height),
        );
        area.fits_within(width, height).then_some(area)
    }

    pub fn crop(&self, image: &RgbImage) -> RgbImage {
        imageops::crop_imm(image, self.x1, self.y1, self.width(), self.height()).to_image()
    }

    pub fn as_tuple(&self) -> (u32, u32, u32, u32) {
        (self.x1, self.y1, self.x2, self.y2)
    }
}

impl std::fmt::Display for SubtitleArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x1, self.y1, self.x2, self.y2)
    }
}
