//! SRT 输出

use crate::core::subtitle::synthesizer::SubtitleEntry;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// 每条：编号、`start --> end`、文本、空行
pub fn render_srt(entries: &[SubtitleEntry]) -> String {
    entries
        .iter()
        .map(|e| {
            format!(
                "{}\n{} --> {}\n{}\n\n",
                e.index,
                e.start_timecode(),
                e.end_timecode(),
                e.text
            )
        })
        .collect()
}

/// 与视频同名的 `.srt`；已存在时追加 ` (1)`、` (2)`… 直到找到未占用的名字
pub fn unique_output_path(video: &Path) -> PathBuf {
    let candidate = video.with_extension("srt");
    if !candidate.exists() {
        return candidate;
    }

    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = video.parent().unwrap_or_else(|| Path::new(""));
    (1u32..)
        .map(|n| parent.join(format!("{stem} ({n}).srt")))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// 写出字幕文件；没有条目时不写文件并返回 None。从不覆盖已有文件。
pub fn save_subtitle(video: &Path, entries: &[SubtitleEntry]) -> std::io::Result<Option<PathBuf>> {
    if entries.is_empty() {
        info!("No lines in subtitles generated. Name: {:?}", video.file_name());
        return Ok(None);
    }
    let path = unique_output_path(video);
    fs::write(&path, render_srt(entries))?;
    info!("💾 Subtitle file saved. Path: {:?}", path);
    Ok(Some(path))
}
