//! 字幕合成：相似度、时间码、字幕段与 SRT 输出

pub mod segment;
pub mod similarity;
pub mod srt;
pub mod synthesizer;
pub mod timecode;

pub use segment::{Segment, SegmentSpan};
pub use similarity::similarity;
pub use srt::{render_srt, save_subtitle, unique_output_path};
pub use synthesizer::{SubtitleEntry, SubtitleSynthesizer};
pub use timecode::timecode;
