//! Download handler for stored compression results

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::debug;

use crate::web::{AppState, responses::blob_store_error, utils::content_disposition};

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    #[serde(default)]
    pub token: String,
}

/// `GET /api/download/{id}?token=...`
pub async fn download_blob(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DownloadParams>,
) -> Response {
    match state.blob_store.get(&id, &params.token) {
        Ok(blob) => (
            [
                (header::CONTENT_TYPE, blob.mime),
                (header::CONTENT_DISPOSITION, content_disposition(&blob.filename)),
            ],
            blob.data,
        )
            .into_response(),
        Err(e) => {
            debug!("Download of {} refused: {}", id, e);
            blob_store_error(&e)
        }
    }
}
