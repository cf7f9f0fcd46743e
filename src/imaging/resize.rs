//! Aspect-preserving resampling to a target width

use image::DynamicImage;
use image::imageops::FilterType;
use std::borrow::Cow;

/// Filter used for every width probe
pub const RESAMPLE_FILTER: FilterType = FilterType::Lanczos3;

/// Height that keeps the source aspect ratio at `width`, rounded, never 0.
pub fn scaled_height(src_width: u32, src_height: u32, width: u32) -> u32 {
    if src_width == 0 {
        return src_height.max(1);
    }

    let scaled = (u64::from(src_height) * u64::from(width) + u64::from(src_width) / 2) / u64::from(src_width);
    scaled.clamp(1, u64::from(u32::MAX)) as u32
}

/// Resample `image` to `width` with the height derived from its aspect ratio.
///
/// Requests for the current width borrow the source instead of copying it.
pub fn resize_to_width(image: &DynamicImage, width: u32) -> Cow<'_, DynamicImage> {
    if width == image.width() {
        return Cow::Borrowed(image);
    }

    let height = scaled_height(image.width(), image.height(), width);
    Cow::Owned(image.resize_exact(width, height, RESAMPLE_FILTER))
}
