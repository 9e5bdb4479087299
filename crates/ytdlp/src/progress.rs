//! Parsing of yt-dlp's `--newline` progress output.

use std::sync::LazyLock;

use regex::Regex;

/// A progress update forwarded to the orchestrator while a file-mode
/// download runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    /// Percent complete, 0.0..=100.0 as reported by the tool.
    pub percent: f32,
}

/// One recognized line of tool output.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressLine {
    /// `[download]   6.2% of ~ 343.72MiB at 420.30KiB/s ETA 12:32`
    Percent(f32),
    /// `[download] Destination: <path>`
    Destination(String),
    /// `[download] <path> has already been downloaded`
    AlreadyDownloaded(String),
}

static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[download\]\s+(\d+(?:\.\d+)?)%").expect("valid progress regex")
});

static DEST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[download\]\s+Destination:\s+(.+)$").expect("valid dest regex"));

static ALREADY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[download\]\s+(.+?)\s+has already been downloaded").expect("valid regex")
});

/// Parse a single stdout line. Returns `None` for lines that carry no
/// progress information (merger output, warnings, blank lines).
pub fn parse_line(line: &str) -> Option<ProgressLine> {
    let line = line.trim_end();

    if let Some(caps) = DEST_RE.captures(line) {
        return Some(ProgressLine::Destination(caps[1].trim().to_string()));
    }
    if let Some(caps) = ALREADY_RE.captures(line) {
        return Some(ProgressLine::AlreadyDownloaded(caps[1].trim().to_string()));
    }
    if let Some(caps) = PERCENT_RE.captures(line) {
        let percent: f32 = caps[1].parse().ok()?;
        return Some(ProgressLine::Percent(percent.clamp(0.0, 100.0)));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fragmented_progress() {
        let line = "[download]   6.2% of ~ 343.72MiB at  420.30KiB/s ETA 12:32 (frag 29/454)";
        assert_eq!(parse_line(line), Some(ProgressLine::Percent(6.2)));
    }

    #[test]
    fn parses_plain_progress() {
        assert_eq!(
            parse_line("[download]  99.7% of 10.00MiB at 1.20MiB/s ETA 00:01"),
            Some(ProgressLine::Percent(99.7))
        );
        assert_eq!(
            parse_line("[download] 100% of 10.00MiB in 00:08"),
            Some(ProgressLine::Percent(100.0))
        );
    }

    #[test]
    fn parses_destination() {
        assert_eq!(
            parse_line("[download] Destination: downloads/My Video.mp4"),
            Some(ProgressLine::Destination("downloads/My Video.mp4".into()))
        );
    }

    #[test]
    fn parses_already_downloaded() {
        assert_eq!(
            parse_line("[download] downloads/My Video.mp4 has already been downloaded"),
            Some(ProgressLine::AlreadyDownloaded("downloads/My Video.mp4".into()))
        );
    }

    #[test]
    fn ignores_unrelated_lines() {
        assert_eq!(parse_line("[Merger] Merging formats into \"out.mp4\""), None);
        assert_eq!(parse_line("WARNING: unable to rename file"), None);
        assert_eq!(parse_line(""), None);
    }
}
