//! Size-constrained encoding
//!
//! [`compress`] is the surface both facades use: it takes a decoded image
//! and returns the widest encoding that fits the byte budget, or a typed
//! failure. [`compress_file`] wraps it with the file handling the CLI needs.

pub mod request;
pub mod search;

use image::DynamicImage;
use std::path::Path;

use crate::errors::{CompressionError, CompressionResult};
use crate::imaging::{self, OutputFormat};

pub use request::{CompressionRequest, DEFAULT_MAX_SIZE, DEFAULT_QUALITY, MIN_WIDTH_FLOOR};
pub use search::{Compressed, Probe, SizeSearchEngine};

/// Compress `image` under `byte_budget` bytes as `format`.
///
/// Unknown formats fail with [`CompressionError::UnsupportedFormat`] before
/// any probe runs, whatever the budget.
pub fn compress(
    image: &DynamicImage,
    byte_budget: usize,
    format: &str,
    quality: u8,
) -> CompressionResult<Compressed> {
    let format: OutputFormat = format.parse()?;
    compress_with(image, CompressionRequest::new(format, quality, byte_budget))
}

/// Compress with an already-built request
pub fn compress_with(image: &DynamicImage, request: CompressionRequest) -> CompressionResult<Compressed> {
    SizeSearchEngine::new(image, request).search()
}

/// Read `input`, compress it and write the result to `output`
pub fn compress_file(
    input: &Path,
    output: &Path,
    request: CompressionRequest,
) -> CompressionResult<Compressed> {
    let image = imaging::decode_file(input)?;
    let compressed = compress_with(&image, request)?;

    std::fs::write(output, &compressed.bytes).map_err(|e| {
        CompressionError::io(
            format!("failed to write compressed image to {}", output.display()),
            e,
        )
    })?;

    Ok(compressed)
}
