//! API request and response models (DTOs).
//!
//! Wire shapes for the download endpoints. Ledger records serialize
//! directly (they already carry their wire representation), so only the
//! request envelopes and the small response wrappers live here.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/download`.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    pub quality: String,
}

/// Query parameters of `GET /api/download` (stream mode).
#[derive(Debug, Clone, Deserialize)]
pub struct StreamParams {
    pub url: Option<String>,
    pub quality: Option<String>,
}

/// Response of `POST /api/download`: the created record plus a
/// human-readable confirmation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadStartedResponse {
    pub id: u64,
    pub url: String,
    pub quality: String,
    pub status: crate::ledger::DownloadStatus,
    pub message: String,
}

/// Body of `POST /api/validate-url`.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateUrlRequest {
    pub url: Option<String>,
}

/// Response of `POST /api/validate-url`.
#[derive(Debug, Clone, Serialize)]
pub struct ValidateUrlResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Query parameters of `GET /api/video-info`.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoInfoParams {
    pub url: Option<String>,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}
