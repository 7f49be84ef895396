use image::RgbImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine init failed: {0}")]
    Init(String),
    #[error("OCR inference failed: {0}")]
    Inference(String),
}

/// 四点多边形，顺序为左上、右上、右下、左下
pub type Polygon = [(f32, f32); 4];

/// 仅检测的结果（区域检测用，不落盘）
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionBox {
    pub polygon: Polygon,
    pub score: f32,
}

impl DetectionBox {
    /// 轴对齐外接矩形 `(x1, y1, x2, y2)`，坐标截断为整数像素
    pub fn envelope(&self) -> (i64, i64, i64, i64) {
        let xs = self.polygon.iter().map(|p| p.0);
        let ys = self.polygon.iter().map(|p| p.1);
        (
            xs.clone().fold(f32::INFINITY, f32::min) as i64,
            ys.clone().fold(f32::INFINITY, f32::min) as i64,
            xs.fold(f32::NEG_INFINITY, f32::max) as i64,
            ys.fold(f32::NEG_INFINITY, f32::max) as i64,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub polygon: Polygon,
    pub text: String,
    pub score: f32,
}

/// 构造引擎所需的选项
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOptions {
    pub language: String,
    pub threads: usize,
}

/// 单个 OCR 引擎实例，一个 worker 持有一个并在整个批次内复用
pub trait OcrEngine: Send {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<DetectionBox>, OcrError>;

    fn recognize(&mut self, image: &RgbImage) -> Result<Vec<RecognizedText>, OcrError>;
}

/// OCR 后端，负责为每个 worker 创建独立的引擎实例
pub trait OcrBackend: Send + Sync {
    fn create_engine(&self, options: &OcrOptions) -> Result<Box<dyn OcrEngine>, OcrError>;
}

/// 按置信度过滤并连接识别文本；没有通过的结果时返回空串
pub fn join_accepted(results: &[RecognizedText], drop_score: f32, separator: &str) -> String {
    results
        .iter()
        .filter(|r| r.score > drop_score)
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x1: f32, y1: f32, x2: f32, y2: f32) -> Polygon {
        [(x1, y1), (x2, y1), (x2, y2), (x1, y2)]
    }

    #[test]
    fn test_envelope() {
        let b = DetectionBox {
            polygon: [(698.4, 160.0), (1218.9, 158.2), (1217.0, 224.7), (699.0, 226.0)],
            score: 0.9,
        };
        assert_eq!(b.envelope(), (698, 158, 1218, 226));
    }

    #[test]
    fn test_join_accepted() {
        let results = vec![
            RecognizedText {
                polygon: rect(0.0, 0.0, 10.0, 10.0),
                text: "第一行".to_string(),
                score: 0.95,
            },
            RecognizedText {
                polygon: rect(0.0, 10.0, 10.0, 20.0),
                text: "噪点".to_string(),
                score: 0.7,
            },
            RecognizedText {
                polygon: rect(0.0, 20.0, 10.0, 30.0),
                text: "第二行".to_string(),
                score: 0.8,
            },
        ];
        assert_eq!(join_accepted(&results, 0.7, " "), "第一行 第二行");
        assert_eq!(join_accepted(&results, 0.7, "\n"), "第一行\n第二行");
        assert_eq!(join_accepted(&results, 0.99, " "), "");
    }
}
