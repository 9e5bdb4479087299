//! Video metadata route.

use axum::{Json, Router, extract::Query, extract::State, routing::get};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::VideoInfoParams;
use crate::api::server::AppState;
use crate::youtube::metadata::{VideoMetadata, build_metadata};
use crate::youtube::url;

/// Create the video-info router.
pub fn router() -> Router<AppState> {
    Router::new().route("/video-info", get(video_info))
}

/// Look up display metadata for a video URL via the configured metadata
/// upstream. Fresh on every call; nothing is cached or stored.
async fn video_info(
    State(state): State<AppState>,
    Query(params): Query<VideoInfoParams>,
) -> ApiResult<Json<VideoMetadata>> {
    let raw = params
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("URL is required"))?;

    if !url::is_well_formed(raw) {
        return Err(ApiError::bad_request("Invalid YouTube URL"));
    }
    let video_id = url::video_id(raw).ok_or_else(|| ApiError::bad_request("Invalid YouTube URL"))?;

    let video_api = state
        .video_api
        .as_ref()
        .ok_or_else(|| ApiError::internal("YouTube API key not configured"))?;

    let raw_video = video_api
        .fetch_video(video_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;

    Ok(Json(build_metadata(&raw_video)))
}
