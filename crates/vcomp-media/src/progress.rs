//! Progress extraction from FFmpeg diagnostics.
//!
//! FFmpeg's stderr is not a stable format, so everything that interprets it
//! lives here. Lines are scanned for an elapsed-time marker
//! (`time=HH:MM:SS.ff`), which appears both in the classic stats line and in
//! the `out_time=` key of `-progress` output.

use regex::Regex;
use std::sync::LazyLock;

/// Highest percentage reported while the process is still running.
/// 100 is reserved for a confirmed successful exit.
pub const MAX_RUNNING_PROGRESS: u8 = 99;

static TIME_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"time=(\d{2}:\d{2}:\d{2}\.\d{2})").expect("valid time regex"));

/// Converts diagnostic lines into completion percentages.
#[derive(Debug, Clone)]
pub struct ProgressExtractor {
    /// Total duration of the base video in seconds
    total_duration: f64,
    /// Last percentage reported
    last: Option<u8>,
}

impl ProgressExtractor {
    /// Create an extractor for a video of `total_duration` seconds.
    pub fn new(total_duration: f64) -> Self {
        Self {
            total_duration,
            last: None,
        }
    }

    /// Feed one line. Returns a percentage when the line carries a time
    /// marker and the total duration is known.
    pub fn feed(&mut self, line: &str) -> Option<u8> {
        if !(self.total_duration.is_finite() && self.total_duration > 0.0) {
            return None;
        }

        let elapsed = extract_elapsed(line)?;
        let percent = (elapsed / self.total_duration * 100.0).floor();
        let percent = if percent.is_finite() && percent > 0.0 {
            percent.min(MAX_RUNNING_PROGRESS as f64) as u8
        } else {
            0
        };

        self.last = Some(percent);
        Some(percent)
    }

    /// Last percentage produced by [`feed`](Self::feed).
    pub fn last_reported(&self) -> Option<u8> {
        self.last
    }
}

/// Elapsed seconds from the first time marker in `line`.
pub fn extract_elapsed(line: &str) -> Option<f64> {
    TIME_MARKER
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| parse_clock(m.as_str()))
}

/// Parse `HH:MM:SS.ff` into seconds.
///
/// Malformed input yields `0.0` rather than an error.
pub fn parse_clock(clock: &str) -> f64 {
    let mut parts = clock.trim().split(':');
    let (Some(h), Some(m), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return 0.0;
    };

    match (h.parse::<u64>(), m.parse::<u64>(), s.parse::<f64>()) {
        (Ok(h), Ok(m), Ok(s)) if s.is_finite() => (h * 3600 + m * 60) as f64 + s,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_way() {
        let mut extractor = ProgressExtractor::new(100.0);
        let line = "frame=  750 fps=250 q=28.0 size=1024kB time=00:00:50.00 bitrate=167.8kbits/s speed=8.3x";
        assert_eq!(extractor.feed(line), Some(50));
        assert_eq!(extractor.last_reported(), Some(50));
    }

    #[test]
    fn test_progress_key_format() {
        let mut extractor = ProgressExtractor::new(100.0);
        assert_eq!(extractor.feed("out_time=00:00:25.000000"), Some(25));
        assert_eq!(extractor.feed("out_time=N/A"), None);
    }

    #[test]
    fn test_clamped_below_completion() {
        let mut extractor = ProgressExtractor::new(100.0);
        assert_eq!(extractor.feed("time=00:01:40.00"), Some(99));
        assert_eq!(extractor.feed("time=01:00:00.00"), Some(99));
    }

    #[test]
    fn test_floors_percentage() {
        let mut extractor = ProgressExtractor::new(3.0);
        // 1 / 3 = 33.3%
        assert_eq!(extractor.feed("time=00:00:01.00"), Some(33));
    }

    #[test]
    fn test_lines_without_marker_ignored() {
        let mut extractor = ProgressExtractor::new(100.0);
        assert_eq!(extractor.feed("Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'in.mp4':"), None);
        assert_eq!(extractor.feed(""), None);
        assert_eq!(extractor.last_reported(), None);
    }

    #[test]
    fn test_unknown_duration_never_reports() {
        for duration in [0.0, -5.0, f64::NAN] {
            let mut extractor = ProgressExtractor::new(duration);
            assert_eq!(extractor.feed("time=00:00:50.00"), None);
            assert_eq!(extractor.last_reported(), None);
        }
    }

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("00:01:40.00"), 100.0);
        assert_eq!(parse_clock("01:00:00.50"), 3600.5);
        assert_eq!(parse_clock("garbage"), 0.0);
        assert_eq!(parse_clock("00:xx:10.00"), 0.0);
        assert_eq!(parse_clock("1:2:3:4"), 0.0);
    }

    #[test]
    fn test_extract_elapsed() {
        assert_eq!(extract_elapsed("size=N/A time=00:00:02.50 bitrate=N/A"), Some(2.5));
        assert_eq!(extract_elapsed("time=N/A"), None);
    }
}
