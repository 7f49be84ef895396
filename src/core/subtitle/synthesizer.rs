//! 字幕合成 - 把逐帧识别结果整理成有序、不重叠的字幕条目
//!
//! 处理顺序固定：
//! 1. 合并相邻的相同文本
//! 2. 合并相邻的相似文本，取持续时间最长的那段文本
//! 3. 删除连续出现的短时段（OCR 闪烁噪声）
//! 4. 删除剩余的过短时段
//! 5. 编号输出
//!
//! 整个过程是输入与阈值的纯函数，同样的输入总得到同样的输出。

use crate::core::cache::FrameText;
use crate::core::config::SubtitleConfig;
use crate::core::subtitle::segment::{Segment, SegmentSpan};
use crate::core::subtitle::similarity::similarity;
use crate::core::subtitle::timecode::timecode;
use log::debug;

/// 最终输出的字幕条目，编号从 1 开始
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    pub index: usize,
    pub start_ms: f64,
    pub end_ms: f64,
    pub text: String,
}

impl SubtitleEntry {
    pub fn start_timecode(&self) -> String {
        timecode(self.start_ms)
    }

    pub fn end_timecode(&self) -> String {
        timecode(self.end_ms)
    }
}

pub struct SubtitleSynthesizer<'a> {
    config: &'a SubtitleConfig,
}

impl<'a> SubtitleSynthesizer<'a> {
    pub fn new(config: &'a SubtitleConfig) -> Self {
        Self { config }
    }

    pub fn synthesize(&self, records: &[FrameText]) -> Vec<SubtitleEntry> {
        let mut records: Vec<&FrameText> = records.iter().filter(|r| !r.text.is_empty()).collect();
        records.sort_by(|a, b| a.timestamp_ms.total_cmp(&b.timestamp_ms));
        debug!("Processing {} non-empty frame text(s)", records.len());

        let segments = merge_adjacent_equal(records);
        let segments = merge_adjacent_similar(segments, self.config.similarity_threshold);
        let segments = remove_short_consecutive(
            segments,
            self.config.min_consecutive_duration_ms,
            self.config.max_consecutive_short_durations,
        );
        let segments = remove_short(segments, self.config.min_duration_ms);

        number_entries(segments)
    }
}

/// 连续且文本完全相同的帧合并为一段 `[首帧, 末帧]`
pub fn merge_adjacent_equal<'r>(records: impl IntoIterator<Item = &'r FrameText>) -> Vec<Segment> {
    debug!("Merging adjacent equal texts");
    let mut segments: Vec<Segment> = Vec::new();

    for record in records {
        match segments.last_mut() {
            Some(last) if last.text == record.text => {
                last.span.end_ms = record.timestamp_ms;
            }
            _ => segments.push(Segment::new(
                SegmentSpan::instant(record.timestamp_ms),
                record.text.clone(),
            )),
        }
    }
    segments
}

/// 相邻段相似度不低于阈值时并入同一组；组的文本取时长最长的段（同长取先出现的）
pub fn merge_adjacent_similar(segments: Vec<Segment>, threshold: f64) -> Vec<Segment> {
    debug!("Merging adjacent similar texts");
    let mut merged: Vec<Segment> = Vec::new();
    let mut iter = segments.into_iter();
    let Some(first) = iter.next() else {
        return merged;
    };

    let mut run_span = first.span;
    let mut best = first;
    let mut previous_text = best.text.clone();

    for segment in iter {
        if similarity(&previous_text, &segment.text) >= threshold {
            run_span = run_span.join(&segment.span);
            previous_text.clone_from(&segment.text);
            if segment.duration() > best.duration() {
                best = segment;
            }
        } else {
            merged.push(Segment::new(run_span, std::mem::take(&mut best.text)));
            run_span = segment.span;
            previous_text.clone_from(&segment.text);
            best = segment;
        }
    }
    merged.push(Segment::new(run_span, best.text));
    merged
}

/// 连续出现的短时段（至少两段且数量达到 `max_count`）整体删除；
/// 夹在长时段之间的孤立短时段保留
pub fn remove_short_consecutive(
    segments: Vec<Segment>,
    min_duration_ms: f64,
    max_count: usize,
) -> Vec<Segment> {
    debug!("Removing short duration consecutive subs");
    let required = max_count.max(2);
    let mut keep = vec![true; segments.len()];
    let mut run_start = 0;
    let mut run_len = 0;

    for i in 0..=segments.len() {
        let is_short = segments
            .get(i)
            .is_some_and(|s| s.duration() < min_duration_ms);
        if is_short {
            if run_len == 0 {
                run_start = i;
            }
            run_len += 1;
            continue;
        }
        if run_len >= required {
            debug!("Dropping {run_len} consecutive short segment(s) from #{run_start}");
            keep[run_start..run_start + run_len].fill(false);
        }
        run_len = 0;
    }

    segments
        .into_iter()
        .zip(keep)
        .filter_map(|(segment, keep)| keep.then_some(segment))
        .collect()
}

/// 删除时长低于 `min_duration_ms` 的段
pub fn remove_short(segments: Vec<Segment>, min_duration_ms: f64) -> Vec<Segment> {
    debug!("Removing short duration subs");
    segments
        .into_iter()
        .filter(|s| s.duration() >= min_duration_ms)
        .collect()
}

pub fn number_entries(segments: Vec<Segment>) -> Vec<SubtitleEntry> {
    segments
        .into_iter()
        .enumerate()
        .map(|(i, segment)| SubtitleEntry {
            index: i + 1,
            start_ms: segment.span.start_ms,
            end_ms: segment.span.end_ms,
            text: segment.text,
        })
        .collect()
}
