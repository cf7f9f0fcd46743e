//! Codec adapter and resampler built on the `image` crate
//!
//! Everything above this module talks in terms of [`OutputFormat`], a closed
//! set of the encoders gitfit supports. Each variant knows its own encoder,
//! MIME type and file extension, so adding a format is an exhaustive change.

pub mod codec;
pub mod resize;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::errors::CompressionError;

pub use codec::{decode, decode_file, detect_format};
pub use resize::{RESAMPLE_FILTER, resize_to_width, scaled_height};

/// Output formats the size search can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Gif,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Jpeg, OutputFormat::Png, OutputFormat::Gif];

    /// Canonical lowercase name, as accepted on the command line and in forms
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Gif => "gif",
        }
    }

    /// Preferred file extension for download filenames
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Gif => "gif",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Gif => "image/gif",
        }
    }

    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            OutputFormat::Jpeg => image::ImageFormat::Jpeg,
            OutputFormat::Png => image::ImageFormat::Png,
            OutputFormat::Gif => image::ImageFormat::Gif,
        }
    }

    /// Infer a target format from a path's extension: `.png` and `.gif` map to
    /// themselves, anything else (including no extension) to jpeg.
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("png") => OutputFormat::Png,
            Some("gif") => OutputFormat::Gif,
            _ => OutputFormat::Jpeg,
        }
    }

    /// Whether the quality parameter influences the encoder
    pub fn uses_quality(&self) -> bool {
        matches!(self, OutputFormat::Jpeg)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "gif" => Ok(OutputFormat::Gif),
            _ => Err(CompressionError::unsupported_format(s)),
        }
    }
}
