use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const DIVIDER: &str = "--";

/// 一段时间跨度 `[start_ms, end_ms]`，文本形式为 `"{start}--{end}"`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentSpan {
    pub start_ms: f64,
    pub end_ms: f64,
}

impl SegmentSpan {
    pub fn new(start_ms: f64, end_ms: f64) -> Self {
        Self { start_ms, end_ms }
    }

    /// 单帧跨度，时长为 0
    pub fn instant(timestamp_ms: f64) -> Self {
        Self::new(timestamp_ms, timestamp_ms)
    }

    pub fn duration(&self) -> f64 {
        self.end_ms - self.start_ms
    }

    /// 保留自身起点与 `later` 的终点
    pub fn join(&self, later: &SegmentSpan) -> Self {
        Self::new(self.start_ms, later.end_ms)
    }
}

impl fmt::Display for SegmentSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{DIVIDER}{:?}", self.start_ms, self.end_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid segment span: {0}")]
pub struct ParseSpanError(pub String);

impl FromStr for SegmentSpan {
    type Err = ParseSpanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once(DIVIDER)
            .ok_or_else(|| ParseSpanError(s.to_string()))?;
        let parse = |v: &str| v.trim().parse::<f64>().map_err(|_| ParseSpanError(s.to_string()));
        Ok(Self::new(parse(start)?, parse(end)?))
    }
}

/// 合成过程中的中间字幕段
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub span: SegmentSpan,
    pub text: String,
}

impl Segment {
    pub fn new(span: SegmentSpan, text: impl Into<String>) -> Self {
        Self {
            span,
            text: text.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.span.duration()
    }
}
