//! API route modules.
//!
//! Organizes routes by resource type.

pub mod downloads;
pub mod health;
pub mod validate;
pub mod video_info;

use axum::Router;

use crate::api::server::AppState;

/// Create the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_router())
        .nest("/health", health::router())
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new()
        .merge(downloads::router())
        .merge(validate::router())
        .merge(video_info::router())
}
