/// 毫秒转 SRT 时间码 `HH:MM:SS,mmm`，小时数不设上限，毫秒截断
pub fn timecode(ms: f64) -> String {
    let ms = ms.max(0.0);
    let total_seconds = (ms / 1000.0).floor() as u64;
    let millis = (ms % 1000.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds / 60) % 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timecode() {
        assert_eq!(timecode(4577987976.0), "1271:39:47,976");
        assert_eq!(timecode(97879869.0), "27:11:19,869");
        assert_eq!(timecode(309485036.0), "85:58:05,036");
        assert_eq!(timecode(378786979.0), "105:13:06,979");
        assert_eq!(timecode(25234.7962452), "00:00:25,234");
        assert_eq!(timecode(6365.242454), "00:00:06,365");
        assert_eq!(timecode(0.0), "00:00:00,000");
    }
}
