//! API error handling.
//!
//! Provides consistent error responses for the API, including the mapping
//! from extraction failures to meaningful HTTP statuses (age-restricted
//! and private videos are 403, unavailable videos and formats are 404).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use ytdlp::ExtractError;

use crate::error::Error;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API error type that can be converted to HTTP responses.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Create a 400 Bad Request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Create a 403 Forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    /// Create a 404 Not Found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// Create a 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    /// Map an extraction failure to an HTTP error. `requested_quality`
    /// lets format errors name the quality the client asked for.
    pub fn from_extract(err: ExtractError, requested_quality: Option<&str>) -> Self {
        match err {
            ExtractError::AgeRestricted => {
                Self::forbidden("This video is age-restricted and cannot be downloaded")
            }
            ExtractError::Private => Self::forbidden("This video is private"),
            ExtractError::Unavailable => Self::not_found("This video is unavailable"),
            ExtractError::FormatUnavailable => {
                let message = match requested_quality {
                    Some(q) => format!("Requested quality {q} is not available for this video"),
                    None => "Requested quality is not available for this video".to_string(),
                };
                Self::not_found(message)
            }
            ExtractError::Playlist => {
                Self::bad_request("Playlists are not supported; submit a single video URL")
            }
            ExtractError::ToolNotFound => {
                tracing::error!("extraction tool missing: {}", err);
                Self::internal("Video download tool is not available")
            }
            other => {
                tracing::error!("extraction failed: {}", other);
                let mut api = Self::internal("Video download failed");
                if let Some(detail) = other.detail() {
                    api = api.with_details(serde_json::json!({ "stderr": detail }));
                }
                api
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorResponse {
            code: self.code,
            message: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound { entity_type, id } => {
                ApiError::not_found(format!("{} with id '{}' not found", entity_type, id))
            }
            Error::Validation(msg) => ApiError::bad_request(msg),
            Error::Configuration(msg) => {
                tracing::error!("configuration error: {}", msg);
                ApiError::internal(msg)
            }
            Error::Upstream(msg) => {
                tracing::error!("upstream error: {}", msg);
                ApiError::internal("Upstream request failed")
            }
            Error::Extract(e) => ApiError::from_extract(e, None),
            Error::Io(e) => {
                tracing::error!("IO error: {}", e);
                ApiError::internal("IO error occurred")
            }
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_bad_request() {
        let api = ApiError::from(Error::validation("Invalid YouTube URL"));
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.message, "Invalid YouTube URL");
    }

    #[test]
    fn not_found_carries_entity_and_id() {
        let api = ApiError::from(Error::not_found("download", "7"));
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert!(api.message.contains("download"));
        assert!(api.message.contains("7"));
    }

    #[test]
    fn restricted_videos_are_forbidden() {
        assert_eq!(
            ApiError::from_extract(ExtractError::AgeRestricted, None).status,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from_extract(ExtractError::Private, None).status,
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn missing_format_names_the_requested_quality() {
        let api = ApiError::from_extract(ExtractError::FormatUnavailable, Some("1080p"));
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert!(api.message.contains("1080p"));
    }

    #[test]
    fn tool_failures_carry_stderr_details() {
        let api = ApiError::from_extract(
            ExtractError::Failed {
                message: "ERROR: something broke".to_string(),
                stderr: "ERROR: something broke\n".to_string(),
            },
            None,
        );
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(api.details.is_some());
    }
}
