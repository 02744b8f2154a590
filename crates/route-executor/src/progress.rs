use std::sync::LazyLock;

use regex::Regex;

static FRAME_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Frame (\d+)/(\d+)").expect("valid regex"));

/// A single frame-progress observation scraped from the container's stdout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameProgress {
    pub current: u64,
    pub total: u64,
}

impl FrameProgress {
    /// Fraction in `[0, 1]` of frames rendered so far.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.current as f64 / self.total as f64).clamp(0.0, 1.0)
        }
    }

    /// Maps frame fraction into the RENDER stage's overall progress window,
    /// `lo + fraction * (hi - lo)` with `lo=35, hi=85` by default.
    pub fn overall_progress(&self, lo: u8, hi: u8) -> u8 {
        let span = (hi - lo) as f64;
        (lo as f64 + self.fraction() * span).round() as u8
    }
}

/// Scans a single line of container output for a `Frame <n>/<N>` marker.
/// Returns `None` for lines that don't match, tolerating arbitrary
/// interleaved log output from the renderer.
pub fn parse_progress_line(line: &str) -> Option<FrameProgress> {
    let caps = FRAME_LINE_RE.captures(line)?;
    let current: u64 = caps.get(1)?.as_str().parse().ok()?;
    let total: u64 = caps.get(2)?.as_str().parse().ok()?;
    Some(FrameProgress { current, total })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_frame_marker_among_other_log_noise() {
        let progress = parse_progress_line("[cesium] Frame 42/120 rendered").unwrap();
        assert_eq!(progress.current, 42);
        assert_eq!(progress.total, 120);
    }

    #[test]
    fn ignores_lines_without_a_frame_marker() {
        assert!(parse_progress_line("Cesium viewer ready").is_none());
    }

    #[test]
    fn overall_progress_remaps_into_the_render_window() {
        let progress = FrameProgress {
            current: 50,
            total: 100,
        };
        assert_eq!(progress.overall_progress(35, 85), 60);
    }

    #[test]
    fn overall_progress_at_each_bound() {
        let start = FrameProgress { current: 0, total: 100 };
        let end = FrameProgress { current: 100, total: 100 };
        assert_eq!(start.overall_progress(35, 85), 35);
        assert_eq!(end.overall_progress(35, 85), 85);
    }
}
