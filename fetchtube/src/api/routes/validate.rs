//! URL validation route.

use axum::{Json, Router, http::StatusCode, routing::post};

use crate::api::models::{ValidateUrlRequest, ValidateUrlResponse};
use crate::api::server::AppState;
use crate::youtube::url;

/// Create the validation router.
pub fn router() -> Router<AppState> {
    Router::new().route("/validate-url", post(validate_url))
}

/// Check whether a submitted URL looks like a downloadable YouTube video
/// link. Shape-only: no network traffic, no ledger writes.
async fn validate_url(
    Json(request): Json<ValidateUrlRequest>,
) -> (StatusCode, Json<ValidateUrlResponse>) {
    let Some(raw) = request.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ValidateUrlResponse {
                valid: false,
                message: Some("URL is required".to_string()),
            }),
        );
    };

    if url::is_well_formed(raw) && url::is_valid(raw) {
        (
            StatusCode::OK,
            Json(ValidateUrlResponse {
                valid: true,
                message: None,
            }),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(ValidateUrlResponse {
                valid: false,
                message: Some("Invalid YouTube URL".to_string()),
            }),
        )
    }
}
