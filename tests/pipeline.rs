use hardsub_extractor::api::{ExtractionOutcome, SubtitleExtractor};
use hardsub_extractor::core::area::SubtitleArea;
use hardsub_extractor::core::ocr::MockOcr;
use hardsub_extractor::core::video::SyntheticVideo;
use hardsub_extractor::core::{ExtractorConfig, StageOutcome};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const WIDTH: u32 = 480;
const HEIGHT: u32 = 270;

/// (起始帧, 结束帧, 条带宽度, 文本)
const SCRIPT: &[(u64, u64, u32, &str)] = &[
    (30, 150, 200, "第一句字幕"),
    (180, 300, 260, "第二句字幕出现了"),
    (300, 420, 120, "第三句"),
    // 一闪而过
    (450, 453, 160, "闪"),
    // 连续的短时噪声
    (500, 504, 80, "噪一"),
    (504, 508, 320, "噪二"),
    (508, 512, 360, "噪三"),
    (512, 516, 400, "噪四"),
    // 中途有两帧识别成形近字
    (900, 1000, 240, "最后一句很长的字幕"),
    (1000, 1004, 280, "最后一句很长的字慕"),
    (1004, 1500, 240, "最后一句很长的字幕"),
];

const TRANSCRIPT: &str = "1\n00:00:01,000 --> 00:00:04,933\n第一句字幕\n\n\
2\n00:00:06,000 --> 00:00:09,933\n第二句字幕出现了\n\n\
3\n00:00:10,000 --> 00:00:13,933\n第三句\n\n\
4\n00:00:30,000 --> 00:00:49,933\n最后一句很长的字幕\n\n";

fn band(width: u32) -> SubtitleArea {
    let x1 = (WIDTH - width) / 2;
    SubtitleArea::new(x1, 220, x1 + width, 244)
}

fn scripted_clip() -> (SyntheticVideo, MockOcr) {
    let mut video = SyntheticVideo::new(30.0, 1830, WIDTH, HEIGHT);
    let mut ocr = MockOcr::new();
    for &(start, end, width, text) in SCRIPT {
        video = video.with_subtitle(start, end, band(width));
        if !text.is_empty() {
            ocr = ocr.with_line(width, text);
        }
    }
    (video, ocr)
}

fn setup(dir: &Path, video: SyntheticVideo, ocr: MockOcr) -> (SubtitleExtractor, PathBuf) {
    let mut config = ExtractorConfig::default().with_cache_dir(dir.join("output"));
    config.frames.workers = 4;
    config.text.workers = 3;
    config.text.batch_size = 64;

    let video_path = dir.join("clip.mp4");
    fs::write(&video_path, b"").unwrap();
    let extractor = SubtitleExtractor::create(config, Arc::new(video), Arc::new(ocr)).unwrap();
    (extractor, video_path)
}

fn written(outcome: ExtractionOutcome) -> PathBuf {
    match outcome {
        ExtractionOutcome::Written(path) => path,
        other => panic!("expected a subtitle file, got {other:?}"),
    }
}

#[test]
fn test_end_to_end_transcript() {
    let dir = tempfile::tempdir().unwrap();
    let (video, ocr) = scripted_clip();
    let (extractor, video_path) = setup(dir.path(), video, ocr);

    let path = written(extractor.run_extraction(&video_path, None, None, None).unwrap());

    assert_eq!(path, dir.path().join("clip.srt"));
    assert_eq!(fs::read_to_string(&path).unwrap(), TRANSCRIPT);
    assert!(!dir.path().join("output").exists());
}

#[test]
fn test_rerun_is_identical_and_never_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let (video, ocr) = scripted_clip();
    let (extractor, video_path) = setup(dir.path(), video, ocr);

    let first = written(extractor.run_extraction(&video_path, None, None, None).unwrap());
    let second = written(extractor.run_extraction(&video_path, None, None, None).unwrap());

    assert_eq!(second, dir.path().join("clip (1).srt"));
    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn test_frame_range_limits_output() {
    let dir = tempfile::tempdir().unwrap();
    let (video, ocr) = scripted_clip();
    let (extractor, video_path) = setup(dir.path(), video, ocr);

    let path = written(
        extractor
            .run_extraction(&video_path, None, Some(0), Some(440))
            .unwrap(),
    );
    let srt = fs::read_to_string(path).unwrap();
    assert!(srt.starts_with("1\n00:00:01,000 --> 00:00:04,933\n第一句字幕\n\n"));
    assert!(srt.contains("3\n00:00:10,000 --> 00:00:13,933\n第三句\n\n"));
    assert!(!srt.contains("最后一句"));
}

#[test]
fn test_detected_area_gives_same_transcript() {
    let dir = tempfile::tempdir().unwrap();
    let (video, ocr) = scripted_clip();
    let (extractor, video_path) = setup(dir.path(), video, ocr);

    let StageOutcome::Completed(Some(area)) = extractor.detect_sub_area(&video_path).unwrap() else {
        panic!("subtitle area should be detected");
    };
    assert!(area.y1 <= 220 && area.y2 >= 244, "{area}");
    assert!(area.fits_within(WIDTH, HEIGHT));

    let path = written(
        extractor
            .run_extraction(&video_path, Some(area), None, None)
            .unwrap(),
    );
    assert_eq!(fs::read_to_string(path).unwrap(), TRANSCRIPT);
}

#[test]
fn test_video_without_text_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let video = SyntheticVideo::new(30.0, 300, WIDTH, HEIGHT);
    let (extractor, video_path) = setup(dir.path(), video, MockOcr::new());

    let outcome = extractor.run_extraction(&video_path, None, None, None).unwrap();
    assert_eq!(outcome, ExtractionOutcome::NoSubtitles);
    assert!(!dir.path().join("clip.srt").exists());
    assert!(!dir.path().join("output").exists());
}

#[test]
fn test_entries_are_ordered() {
    let dir = tempfile::tempdir().unwrap();
    let (video, ocr) = scripted_clip();
    let (extractor, video_path) = setup(dir.path(), video, ocr);

    let path = written(extractor.run_extraction(&video_path, None, None, None).unwrap());
    let srt = fs::read_to_string(path).unwrap();
    let spans: Vec<(String, String)> = srt
        .lines()
        .filter_map(|line| line.split_once(" --> "))
        .map(|(start, end)| (start.to_string(), end.to_string()))
        .collect();

    assert_eq!(spans.len(), 4);
    for pair in spans.windows(2) {
        // 定长时间码，字典序即时间顺序
        assert!(pair[0].1 <= pair[1].0);
    }
}
