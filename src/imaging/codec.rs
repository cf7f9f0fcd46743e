//! Decoding uploads and encoding probe candidates

use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageFormat, ImageResult};
use std::io::Cursor;
use std::path::Path;

use super::OutputFormat;
use crate::errors::{CompressionError, CompressionResult};

/// Decode any supported image from memory
pub fn decode(bytes: &[u8]) -> CompressionResult<DynamicImage> {
    image::load_from_memory(bytes).map_err(CompressionError::Decode)
}

/// Read and decode an image file
pub fn decode_file(path: &Path) -> CompressionResult<DynamicImage> {
    let bytes = std::fs::read(path)
        .map_err(|e| CompressionError::io(format!("failed to open input file {}", path.display()), e))?;
    decode(&bytes)
}

/// Sniff the container format of encoded bytes
pub fn detect_format(bytes: &[u8]) -> Option<OutputFormat> {
    match image::guess_format(bytes).ok()? {
        ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
        ImageFormat::Png => Some(OutputFormat::Png),
        ImageFormat::Gif => Some(OutputFormat::Gif),
        _ => None,
    }
}

impl OutputFormat {
    /// Encode `image` in this format. `quality` (1-100) only affects jpeg.
    pub fn encode(&self, image: &DynamicImage, quality: u8) -> ImageResult<Vec<u8>> {
        let mut buf = Vec::new();

        match self {
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = image.to_rgb8();
                let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
                encoder.encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)?;
            }
            OutputFormat::Png => {
                image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
            }
            OutputFormat::Gif => {
                let rgba = image.to_rgba8();
                // The trailer is written when the encoder is dropped at the end of this arm
                let mut encoder = GifEncoder::new(&mut buf);
                encoder.encode(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)?;
            }
        }

        Ok(buf)
    }
}
