//! HTTP response types and error mapping
//!
//! Error bodies are flat JSON objects (`{"error": ...}`) so the frontend can
//! show `error` directly and `detail` when present.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::errors::{BlobStoreError, CompressionError};

/// Error body shared by every API endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: None,
            message: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// `GET /api/health` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime: String,
    pub timestamp: String,
}

/// `POST /api/compress` success body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressResponse {
    pub filename: String,
    pub size: usize,
    pub mime: String,
    pub message: String,
    pub download_url: String,
    /// Seconds until the download link stops working
    pub expires_in: u64,
}

pub fn bad_request(error: &str) -> Response {
    ErrorResponse::new(error).into_response_with(StatusCode::BAD_REQUEST)
}

pub fn internal_error(error: &str) -> Response {
    ErrorResponse::new(error).into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Status for a failed compression: caller mistakes are 400, a budget that
/// cannot be met is 422, anything else is ours
pub fn compression_status(error: &CompressionError) -> StatusCode {
    match error {
        CompressionError::BudgetUnattainable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn compression_failed(error: &CompressionError) -> Response {
    ErrorResponse::new("compression failed")
        .with_detail(error.to_string())
        .into_response_with(compression_status(error))
}

pub fn blob_store_error(error: &BlobStoreError) -> Response {
    let status = match error {
        BlobStoreError::NotFound => StatusCode::NOT_FOUND,
        BlobStoreError::Forbidden => StatusCode::FORBIDDEN,
    };
    ErrorResponse::new(error.to_string()).into_response_with(status)
}

pub fn api_not_found() -> Response {
    ErrorResponse::new("not found")
        .with_message("API endpoint does not exist")
        .into_response_with(StatusCode::NOT_FOUND)
}
