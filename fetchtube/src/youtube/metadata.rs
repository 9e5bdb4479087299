//! Metadata adapter for the YouTube Data API upstream.
//!
//! Turns a video id into a display-ready [`VideoMetadata`] record:
//! ISO-8601 duration tokens become `H:MM:SS` strings, raw view counts
//! become `1.5M views`, and the best available thumbnail is picked. The
//! upstream sits behind the narrow [`VideoDataApi`] trait so tests can
//! substitute a stub.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

const VIDEOS_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/videos";

/// Quality labels offered to the UI. The actual format availability is
/// only known to the extraction tool at download time.
const QUALITY_LABELS: [&str; 4] = ["360p", "480p", "720p", "1080p"];

/// Display-ready metadata for a single video. Ephemeral: constructed
/// fresh per request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub title: String,
    /// Human-readable duration, `H:MM:SS` or `M:SS`.
    pub duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,
    pub available_qualities: Vec<String>,
    pub is_age_restricted: bool,
}

// Wire types for the upstream response. Only the fields we read are
// modeled; everything else is ignored.

#[derive(Debug, Clone, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<RawVideo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVideo {
    pub snippet: RawSnippet,
    pub content_details: RawContentDetails,
    #[serde(default)]
    pub statistics: Option<RawStatistics>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSnippet {
    pub title: String,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub thumbnails: RawThumbnails,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawThumbnails {
    #[serde(default)]
    pub maxres: Option<RawThumbnail>,
    #[serde(default)]
    pub high: Option<RawThumbnail>,
    #[serde(default)]
    pub medium: Option<RawThumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawThumbnail {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContentDetails {
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub content_rating: Option<RawContentRating>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContentRating {
    #[serde(default)]
    pub yt_rating: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStatistics {
    #[serde(default)]
    pub view_count: Option<String>,
}

/// The metadata upstream: one video lookup by id. `Ok(None)` means the
/// upstream reported zero results.
#[async_trait]
pub trait VideoDataApi: Send + Sync {
    async fn fetch_video(&self, video_id: &str) -> Result<Option<RawVideo>>;
}

/// YouTube Data API v3 client.
pub struct YouTubeDataApi {
    client: reqwest::Client,
    api_key: String,
}

impl YouTubeDataApi {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl VideoDataApi for YouTubeDataApi {
    async fn fetch_video(&self, video_id: &str) -> Result<Option<RawVideo>> {
        let response = self
            .client
            .get(VIDEOS_ENDPOINT)
            .query(&[
                ("part", "snippet,contentDetails,statistics"),
                ("id", video_id),
                ("key", &self.api_key),
            ])
            .send()
            .await
            .map_err(|e| Error::upstream(format!("metadata request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::upstream(format!(
                "metadata upstream returned {}",
                response.status()
            )));
        }

        let body: VideoListResponse = response
            .json()
            .await
            .map_err(|e| Error::upstream(format!("metadata response unreadable: {e}")))?;

        debug!(video_id, items = body.items.len(), "metadata fetched");
        Ok(body.items.into_iter().next())
    }
}

/// Build the display record from the raw upstream payload.
pub fn build_metadata(raw: &RawVideo) -> VideoMetadata {
    let duration = raw
        .content_details
        .duration
        .as_deref()
        .map(parse_duration)
        .unwrap_or_else(|| "0:00".to_string());

    let view_count = raw
        .statistics
        .as_ref()
        .and_then(|s| s.view_count.as_deref())
        .and_then(|v| v.parse::<u64>().ok())
        .map(format_view_count);

    let upload_date = raw.snippet.published_at.as_deref().and_then(|ts| {
        chrono::DateTime::parse_from_rfc3339(ts)
            .ok()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
    });

    let is_age_restricted = raw
        .content_details
        .content_rating
        .as_ref()
        .and_then(|r| r.yt_rating.as_deref())
        == Some("ytAgeRestricted");

    VideoMetadata {
        title: raw.snippet.title.clone(),
        duration,
        thumbnail: pick_thumbnail(&raw.snippet.thumbnails),
        view_count,
        upload_date,
        available_qualities: QUALITY_LABELS.iter().map(|s| s.to_string()).collect(),
        is_age_restricted,
    }
}

/// Highest-resolution thumbnail available: maxres, then high, then
/// medium; none of the three means no thumbnail.
fn pick_thumbnail(thumbnails: &RawThumbnails) -> Option<String> {
    thumbnails
        .maxres
        .as_ref()
        .or(thumbnails.high.as_ref())
        .or(thumbnails.medium.as_ref())
        .map(|t| t.url.clone())
}

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").expect("valid duration pattern")
});

/// Render an ISO-8601-like duration token (`PT#H#M#S`, each component
/// optional) as `H:MM:SS` when hours are present, else `M:SS`. Components
/// default to 0; anything unmatched renders as `0:00`.
pub fn parse_duration(token: &str) -> String {
    let Some(caps) = DURATION_RE.captures(token) else {
        return "0:00".to_string();
    };

    let part = |i: usize| -> u64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    let (hours, minutes, seconds) = (part(1), part(2), part(3));

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Render a raw view count the way the UI expects: `1.5M views`,
/// `2.5K views`, or `42 views`.
pub fn format_view_count(views: u64) -> String {
    if views >= 1_000_000 {
        format!("{:.1}M views", views as f64 / 1_000_000.0)
    } else if views >= 1_000 {
        format!("{:.1}K views", views as f64 / 1_000.0)
    } else {
        format!("{views} views")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_video(json: serde_json::Value) -> RawVideo {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn duration_rendering() {
        assert_eq!(parse_duration("PT1H2M3S"), "1:02:03");
        assert_eq!(parse_duration("PT5M9S"), "5:09");
        assert_eq!(parse_duration("PT45S"), "0:45");
        assert_eq!(parse_duration("PT2H"), "2:00:00");
        assert_eq!(parse_duration("garbage"), "0:00");
        assert_eq!(parse_duration(""), "0:00");
    }

    #[test]
    fn view_count_rendering() {
        assert_eq!(format_view_count(1_500_000), "1.5M views");
        assert_eq!(format_view_count(2_500), "2.5K views");
        assert_eq!(format_view_count(42), "42 views");
        assert_eq!(format_view_count(1_000_000), "1.0M views");
        assert_eq!(format_view_count(999), "999 views");
    }

    #[test]
    fn thumbnail_preference_order() {
        let video = raw_video(serde_json::json!({
            "snippet": {
                "title": "t",
                "thumbnails": {
                    "medium": {"url": "m"},
                    "high": {"url": "h"},
                    "maxres": {"url": "x"}
                }
            },
            "contentDetails": {"duration": "PT1M"}
        }));
        assert_eq!(build_metadata(&video).thumbnail.as_deref(), Some("x"));

        let video = raw_video(serde_json::json!({
            "snippet": {"title": "t", "thumbnails": {"medium": {"url": "m"}}},
            "contentDetails": {}
        }));
        assert_eq!(build_metadata(&video).thumbnail.as_deref(), Some("m"));

        let video = raw_video(serde_json::json!({
            "snippet": {"title": "t"},
            "contentDetails": {}
        }));
        assert_eq!(build_metadata(&video).thumbnail, None);
    }

    #[test]
    fn age_restriction_flag() {
        let video = raw_video(serde_json::json!({
            "snippet": {"title": "t"},
            "contentDetails": {"contentRating": {"ytRating": "ytAgeRestricted"}}
        }));
        assert!(build_metadata(&video).is_age_restricted);

        let video = raw_video(serde_json::json!({
            "snippet": {"title": "t"},
            "contentDetails": {"contentRating": {}}
        }));
        assert!(!build_metadata(&video).is_age_restricted);
    }

    #[test]
    fn full_record_comes_out_display_ready() {
        let video = raw_video(serde_json::json!({
            "snippet": {
                "title": "Some Video",
                "publishedAt": "2023-06-15T12:00:00Z",
                "thumbnails": {"high": {"url": "thumb"}}
            },
            "contentDetails": {"duration": "PT5M9S"},
            "statistics": {"viewCount": "2500"}
        }));
        let meta = build_metadata(&video);

        assert_eq!(meta.title, "Some Video");
        assert_eq!(meta.duration, "5:09");
        assert_eq!(meta.view_count.as_deref(), Some("2.5K views"));
        assert_eq!(meta.upload_date.as_deref(), Some("2023-06-15"));
        assert_eq!(meta.available_qualities.len(), 4);
        assert!(!meta.is_age_restricted);
    }

    #[test]
    fn metadata_serializes_camel_case() {
        let video = raw_video(serde_json::json!({
            "snippet": {"title": "t"},
            "contentDetails": {"duration": "PT45S"}
        }));
        let json = serde_json::to_value(build_metadata(&video)).unwrap();

        assert_eq!(json["duration"], "0:45");
        assert!(json["availableQualities"].is_array());
        assert_eq!(json["isAgeRestricted"], false);
        // Absent optionals are omitted, not null.
        assert!(json.get("viewCount").is_none());
    }
}
