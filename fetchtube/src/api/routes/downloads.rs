//! Download routes.
//!
//! `POST /api/download` starts a background (job-mode) download and
//! returns the ledger record immediately; clients poll
//! `GET /api/download/{id}` for progress. `GET /api/download` is stream
//! mode: the selected format is piped straight into the response body as
//! a file attachment.

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::Response,
    routing::{get, post},
};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{DownloadRequest, DownloadStartedResponse, StreamParams};
use crate::api::server::AppState;
use crate::download::DownloadManager;
use crate::error::Error;
use crate::ledger::DownloadRecord;

/// Create the downloads router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/download", post(start_download).get(stream_download))
        .route("/download/{id}", get(get_download).delete(delete_download))
        .route("/downloads", get(list_downloads))
}

fn require_manager(state: &AppState) -> Result<&DownloadManager, ApiError> {
    state
        .download_manager
        .as_deref()
        .ok_or_else(|| ApiError::internal("Download manager not configured"))
}

/// Map a download failure, naming the requested quality in format errors.
fn download_error(err: Error, quality: &str) -> ApiError {
    match err {
        Error::Extract(e) => ApiError::from_extract(e, Some(quality)),
        other => ApiError::from(other),
    }
}

/// Start a background download. Returns 201 with the created record;
/// invalid input is rejected with 400 before anything is recorded.
async fn start_download(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> ApiResult<(StatusCode, Json<DownloadStartedResponse>)> {
    let manager = require_manager(&state)?;
    let record = manager
        .start_download(&request.url, &request.quality)
        .map_err(ApiError::from)?;

    let response = DownloadStartedResponse {
        id: record.id,
        url: record.url,
        quality: record.quality,
        status: record.status,
        message: "Download started successfully".to_string(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Stream a download directly to the client as a file attachment.
async fn stream_download(
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
) -> ApiResult<Response> {
    let manager = require_manager(&state)?;
    let url = params
        .url
        .ok_or_else(|| ApiError::bad_request("URL is required"))?;
    let quality = params
        .quality
        .ok_or_else(|| ApiError::bad_request("Quality is required"))?;

    let download = manager
        .open_stream(&url, &quality)
        .await
        .map_err(|e| download_error(e, &quality))?;

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, download.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download.filename),
        );
    if let Some(length) = download.content_length {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }

    builder
        .body(Body::from_stream(download.body))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {e}")))
}

/// Get a download record by id.
async fn get_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DownloadRecord>> {
    let ledger = state
        .ledger
        .as_ref()
        .ok_or_else(|| ApiError::internal("Download ledger not configured"))?;

    let id: u64 = id
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid download ID"))?;

    let record = ledger
        .get(id)
        .ok_or_else(|| ApiError::not_found(format!("download with id '{id}' not found")))?;
    Ok(Json(record))
}

/// Delete a download record. 204 on success, 404 for unknown ids.
async fn delete_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let ledger = state
        .ledger
        .as_ref()
        .ok_or_else(|| ApiError::internal("Download ledger not configured"))?;

    let id: u64 = id
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid download ID"))?;

    if ledger.delete(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!(
            "download with id '{id}' not found"
        )))
    }
}

/// List all download records.
async fn list_downloads(State(state): State<AppState>) -> ApiResult<Json<Vec<DownloadRecord>>> {
    let ledger = state
        .ledger
        .as_ref()
        .ok_or_else(|| ApiError::internal("Download ledger not configured"))?;
    Ok(Json(ledger.list_all()))
}
