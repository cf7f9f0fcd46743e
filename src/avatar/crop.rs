//! Square cropping for avatar uploads

use image::{DynamicImage, GenericImageView, ImageResult};
use std::borrow::Cow;

use crate::imaging::OutputFormat;

/// JPEG quality used when re-encoding a cropped avatar
pub const AVATAR_JPEG_QUALITY: u8 = 95;

/// Center-crop to `min(width, height)` on both sides. Square input is
/// borrowed back unchanged.
pub fn crop_to_square(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    let (width, height) = image.dimensions();
    if width == height {
        return Cow::Borrowed(image);
    }

    let side = width.min(height);
    let x = (width - side) / 2;
    let y = (height - side) / 2;

    Cow::Owned(image.crop_imm(x, y, side, side))
}

/// Crop and encode for upload. PNG sources stay PNG, everything else
/// becomes a high-quality JPEG.
pub fn square_avatar(image: &DynamicImage, source: Option<OutputFormat>) -> ImageResult<(Vec<u8>, OutputFormat)> {
    let format = match source {
        Some(OutputFormat::Png) => OutputFormat::Png,
        _ => OutputFormat::Jpeg,
    };

    let square = crop_to_square(image);
    let bytes = format.encode(&square, AVATAR_JPEG_QUALITY)?;
    Ok((bytes, format))
}
