use crate::core::ocr::engine::{
    DetectionBox, OcrBackend, OcrEngine, OcrError, OcrOptions, Polygon, RecognizedText,
};
use image::RgbImage;

const BRIGHT_THRESHOLD: u8 = 200;
const WIDTH_TOLERANCE: u32 = 8;

/// 模拟 OCR：把画面中的高亮区域当作一行文字
///
/// 检测结果是高亮像素的外接矩形；识别时按该矩形宽度查表得到文字，
/// 配合 `SyntheticVideo` 用宽度不同的白色条带表示不同字幕。
#[derive(Debug, Clone)]
pub struct MockOcr {
    lines: Vec<(u32, String)>,
    score: f32,
    fail_recognition: bool,
}

impl MockOcr {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            score: 0.95,
            fail_recognition: false,
        }
    }

    /// 宽度约为 `band_width` 的高亮条带识别为 `text`
    pub fn with_line(mut self, band_width: u32, text: impl Into<String>) -> Self {
        self.lines.push((band_width, text.into()));
        self
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    pub fn failing_recognition(mut self) -> Self {
        self.fail_recognition = true;
        self
    }

    fn bright_envelope(image: &RgbImage) -> Option<Polygon> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, pixel) in image.enumerate_pixels() {
            if pixel.0.iter().all(|&c| c > BRIGHT_THRESHOLD) {
                let b = bounds.get_or_insert((x, y, x, y));
                b.0 = b.0.min(x);
                b.1 = b.1.min(y);
                b.2 = b.2.max(x);
                b.3 = b.3.max(y);
            }
        }
        bounds.map(|(x1, y1, x2, y2)| {
            let (x1, y1) = (x1 as f32, y1 as f32);
            let (x2, y2) = ((x2 + 1) as f32, (y2 + 1) as f32);
            [(x1, y1), (x2, y1), (x2, y2), (x1, y2)]
        })
    }

    fn text_for_width(&self, width: u32) -> Option<&str> {
        self.lines
            .iter()
            .map(|(w, text)| (w.abs_diff(width), text))
            .filter(|(diff, _)| *diff <= WIDTH_TOLERANCE)
            .min_by_key(|(diff, _)| *diff)
            .map(|(_, text)| text.as_str())
    }
}

impl Default for MockOcr {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for MockOcr {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<DetectionBox>, OcrError> {
        Ok(Self::bright_envelope(image)
            .map(|polygon| DetectionBox {
                polygon,
                score: self.score,
            })
            .into_iter()
            .collect())
    }

    fn recognize(&mut self, image: &RgbImage) -> Result<Vec<RecognizedText>, OcrError> {
        if self.fail_recognition {
            return Err(OcrError::Inference("mock recognition failure".to_string()));
        }
        let Some(polygon) = Self::bright_envelope(image) else {
            return Ok(Vec::new());
        };
        let width = (polygon[1].0 - polygon[0].0) as u32;
        Ok(self
            .text_for_width(width)
            .map(|text| RecognizedText {
                polygon,
                text: text.to_string(),
                score: self.score,
            })
            .into_iter()
            .collect())
    }
}

impl OcrBackend for MockOcr {
    fn create_engine(&self, _options: &OcrOptions) -> Result<Box<dyn OcrEngine>, OcrError> {
        Ok(Box::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_detects_bright_band() {
        let mut image = RgbImage::from_pixel(100, 40, Rgb([10, 10, 10]));
        for y in 5..15 {
            for x in 20..70 {
                image.put_pixel(x, y, Rgb([250, 250, 250]));
            }
        }

        let mut ocr = MockOcr::new().with_line(50, "字幕");
        let boxes = ocr.detect(&image).unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].envelope(), (20, 5, 70, 15));

        let texts = ocr.recognize(&image).unwrap();
        assert_eq!(texts[0].text, "字幕");
    }

    #[test]
    fn test_dark_image_has_no_text() {
        let image = RgbImage::from_pixel(100, 40, Rgb([10, 10, 10]));
        let mut ocr = MockOcr::new().with_line(50, "字幕");
        assert!(ocr.detect(&image).unwrap().is_empty());
        assert!(ocr.recognize(&image).unwrap().is_empty());
    }
}
