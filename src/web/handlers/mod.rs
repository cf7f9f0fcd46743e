//! HTTP request handlers organized by endpoint

use axum::response::Response;

pub mod compress;
pub mod download;
pub mod health;

/// JSON 404 for unknown `/api/*` paths
pub async fn api_not_found() -> Response {
    super::responses::api_not_found()
}
