//! Extraction error types and stderr classification.

use thiserror::Error;

/// Errors surfaced by the yt-dlp bridge.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The yt-dlp binary could not be located.
    #[error("yt-dlp binary not found; install yt-dlp or set YTDLP_BIN")]
    ToolNotFound,

    /// The video requires an age-verified session.
    #[error("video is age-restricted")]
    AgeRestricted,

    /// The video is private.
    #[error("video is private")]
    Private,

    /// The video was removed or never existed.
    #[error("video is unavailable")]
    Unavailable,

    /// No format matched the requested selector.
    #[error("requested format is not available")]
    FormatUnavailable,

    /// The URL resolves to a playlist or other collection.
    #[error("url resolves to a playlist; only single videos are supported")]
    Playlist,

    /// The tool's JSON output could not be parsed.
    #[error("failed to parse yt-dlp output: {0}")]
    Parse(String),

    /// Spawning or talking to the subprocess failed.
    #[error("subprocess error: {0}")]
    Io(#[from] std::io::Error),

    /// The tool exited non-zero for a reason we could not classify.
    /// `message` is a one-line digest; `stderr` keeps the raw tail for
    /// diagnostics.
    #[error("yt-dlp failed: {message}")]
    Failed { message: String, stderr: String },
}

impl ExtractError {
    /// Diagnostic detail worth attaching to an error response, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Failed { stderr, .. } if !stderr.is_empty() => Some(stderr),
            Self::Parse(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Maximum stderr tail carried inside [`ExtractError::Failed`].
const STDERR_TAIL_BYTES: usize = 4096;

/// Classify a non-zero exit by inspecting the tool's stderr.
///
/// yt-dlp reports restrictions as free-form `ERROR:` lines; the phrases
/// matched here track the tool's wording for age gates, private videos,
/// removed content, and unmatched format selectors.
pub fn classify_stderr(stderr: &str) -> ExtractError {
    let lower = stderr.to_lowercase();

    if lower.contains("sign in to confirm your age")
        || lower.contains("age-restricted")
        || lower.contains("age restricted")
    {
        return ExtractError::AgeRestricted;
    }
    if lower.contains("private video") || lower.contains("this video is private") {
        return ExtractError::Private;
    }
    if lower.contains("video unavailable")
        || lower.contains("this video is not available")
        || lower.contains("has been removed")
    {
        return ExtractError::Unavailable;
    }
    if lower.contains("requested format is not available") {
        return ExtractError::FormatUnavailable;
    }

    ExtractError::Failed {
        message: first_error_line(stderr),
        stderr: tail(stderr, STDERR_TAIL_BYTES),
    }
}

/// Pick the most useful single line out of stderr: the first `ERROR:`
/// line if present, otherwise the last non-empty line.
fn first_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| stderr.lines().map(str::trim).rev().find(|l| !l.is_empty()))
        .unwrap_or("yt-dlp exited with an error")
        .to_string()
}

fn tail(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    // Cut on a char boundary near the tail.
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}
