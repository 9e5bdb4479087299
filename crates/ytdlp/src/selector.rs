//! Requested quality and format-selector construction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The fixed set of requestable qualities, plus the `best` sentinel that
/// bypasses height capping entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "best")]
    Best,
}

/// The submitted quality string was not one of the accepted labels.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown quality '{0}'; expected one of 360p, 480p, 720p, 1080p, best")]
pub struct InvalidQuality(pub String);

impl Quality {
    pub const ALL: [Quality; 5] = [
        Quality::P360,
        Quality::P480,
        Quality::P720,
        Quality::P1080,
        Quality::Best,
    ];

    /// Height cap for this quality, `None` for the `best` sentinel.
    pub fn height(self) -> Option<u32> {
        match self {
            Quality::P360 => Some(360),
            Quality::P480 => Some(480),
            Quality::P720 => Some(720),
            Quality::P1080 => Some(1080),
            Quality::Best => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Quality::P360 => "360p",
            Quality::P480 => "480p",
            Quality::P720 => "720p",
            Quality::P1080 => "1080p",
            Quality::Best => "best",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Quality {
    type Err = InvalidQuality;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "360p" => Ok(Quality::P360),
            "480p" => Ok(Quality::P480),
            "720p" => Ok(Quality::P720),
            "1080p" => Ok(Quality::P1080),
            "best" => Ok(Quality::Best),
            other => Err(InvalidQuality(other.to_string())),
        }
    }
}

/// Build the yt-dlp format selector for a requested quality.
///
/// For a capped height this is a descending preference chain: best mp4 at
/// or under the requested height, else best webm at or under it, else best
/// available regardless of height — so an unavailable exact match degrades
/// gracefully instead of failing outright. Only progressive (single-file)
/// formats are selected, since stdout streaming cannot merge separate
/// video and audio tracks.
pub fn format_selector(quality: Quality) -> String {
    match quality.height() {
        Some(h) => format!("best[ext=mp4][height<={h}]/best[ext=webm][height<={h}]/best"),
        None => "best".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_labels() {
        for q in Quality::ALL {
            assert_eq!(q.label().parse::<Quality>().unwrap(), q);
        }
    }

    #[test]
    fn rejects_unknown_labels() {
        assert!("".parse::<Quality>().is_err());
        assert!("240p".parse::<Quality>().is_err());
        assert!("1080".parse::<Quality>().is_err());
        assert!("BEST".parse::<Quality>().is_err());
    }

    #[test]
    fn capped_selector_degrades_through_containers() {
        assert_eq!(
            format_selector(Quality::P720),
            "best[ext=mp4][height<=720]/best[ext=webm][height<=720]/best"
        );
    }

    #[test]
    fn best_bypasses_height_capping() {
        assert_eq!(format_selector(Quality::Best), "best");
    }

    #[test]
    fn quality_serde_round_trip() {
        let q: Quality = serde_json::from_str("\"1080p\"").unwrap();
        assert_eq!(q, Quality::P1080);
        assert_eq!(serde_json::to_string(&Quality::Best).unwrap(), "\"best\"");
    }
}
