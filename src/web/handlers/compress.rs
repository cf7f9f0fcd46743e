//! Upload-and-compress handler

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tracing::{error, info, warn};

use crate::compression::{self, CompressionRequest};
use crate::imaging::{self, OutputFormat};
use crate::web::{
    AppState,
    responses::{CompressResponse, ErrorResponse, bad_request, compression_failed, internal_error},
    utils::{download_base, download_filename, download_url, request_host, request_scheme},
};

/// Multipart field carrying the image
pub const UPLOAD_FIELD: &str = "avatar";

#[derive(Debug, Default)]
struct CompressForm {
    file_name: Option<String>,
    data: Option<Bytes>,
    maxsize: Option<String>,
    format: Option<String>,
    quality: Option<String>,
}

/// `POST /api/compress`
///
/// Decoding and the size search run on the blocking pool; only the finished
/// bytes touch the blob store.
pub async fn compress_image(State(state): State<AppState>, headers: HeaderMap, multipart: Multipart) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(e) => {
            warn!("Rejected malformed multipart upload: {}", e);
            return ErrorResponse::new("invalid multipart body")
                .with_detail(e.body_text())
                .into_response_with(e.status());
        }
    };

    let Some(data) = form.data else {
        return bad_request("missing 'avatar' file field");
    };

    // Checked up front so a bad Host never leaves an unreachable blob behind
    let fallback_host = format!("localhost:{}", state.config.web.port);
    let base_url = match download_base(request_scheme(&headers), &request_host(&headers, &fallback_host)) {
        Ok(base) => base,
        Err(e) => {
            warn!("Could not build download URL: {}", e);
            return bad_request("invalid Host header");
        }
    };

    let defaults = &state.config.compression;
    let max_size = parse_max_size(form.maxsize.as_deref(), defaults.default_max_size);
    let quality = parse_quality(form.quality.as_deref(), defaults.default_quality);
    let format: OutputFormat = match form.format.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        Some(name) => match name.parse() {
            Ok(format) => format,
            Err(e) => return compression_failed(&e),
        },
        None => OutputFormat::Jpeg,
    };

    let request = CompressionRequest::new(format, quality, max_size).with_min_width(defaults.min_width);

    let outcome = tokio::task::spawn_blocking(move || {
        let image = imaging::decode(&data)?;
        compression::compress_with(&image, request)
    })
    .await;

    let compressed = match outcome {
        Ok(Ok(compressed)) => compressed,
        Ok(Err(e)) => {
            info!("Compression of {:?} failed: {}", form.file_name, e);
            return compression_failed(&e);
        }
        Err(e) => {
            error!("Compression task panicked or was cancelled: {}", e);
            return internal_error("compression failed");
        }
    };

    let filename = download_filename(form.file_name.as_deref(), format);
    let width = compressed.width;
    let height = compressed.height;
    let size = compressed.size();

    let receipt = state
        .blob_store
        .put(Bytes::from(compressed.into_bytes()), format.mime_type(), &filename);
    let url = download_url(&base_url, &receipt.id, &receipt.token);

    info!(
        "Compressed {} to {}x{} {} ({} bytes, budget {})",
        filename, width, height, format, size, max_size
    );

    (
        StatusCode::OK,
        Json(CompressResponse {
            filename,
            size,
            mime: format.mime_type().to_string(),
            message: "compression successful".to_string(),
            download_url: url,
            expires_in: state.blob_store.ttl().as_secs(),
        }),
    )
        .into_response()
}

async fn read_form(mut multipart: Multipart) -> Result<CompressForm, MultipartError> {
    let mut form = CompressForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            UPLOAD_FIELD => {
                form.file_name = field.file_name().map(str::to_string);
                form.data = Some(field.bytes().await?);
            }
            "maxsize" => form.maxsize = Some(field.text().await?),
            "format" => form.format = Some(field.text().await?),
            "quality" => form.quality = Some(field.text().await?),
            _ => {}
        }
    }

    Ok(form)
}

/// Positive integer, otherwise the default
fn parse_max_size(value: Option<&str>, default: usize) -> usize {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(default)
}

/// 1..=100, otherwise the default
fn parse_quality(value: Option<&str>, default: u8) -> u8 {
    value
        .and_then(|v| v.trim().parse::<u8>().ok())
        .filter(|q| (1..=100).contains(q))
        .unwrap_or(default)
}
