//! OCR 适配层与文字提取阶段

pub mod engine;
pub mod extractor;
pub mod mock;

pub use engine::{
    join_accepted, DetectionBox, OcrBackend, OcrEngine, OcrError, OcrOptions, Polygon,
    RecognizedText,
};
pub use extractor::TextExtractor;
pub use mock::MockOcr;
