//! Width search under a byte budget
//!
//! The search runs in two phases:
//!
//! 1. A binary search over `[floor, W0]` that keeps the widest width whose
//!    encoding fit. Encoded size is not strictly monotonic in width (entropy
//!    coding produces local bumps), so this finds a good width, not a proven
//!    maximum. An image narrower than the floor has an empty domain and
//!    fails as unattainable.
//! 2. A descending walk from that width in steps of 5% (at least one pixel),
//!    returning the first width that fits. The walk starts at the phase 1
//!    width, which already fit, so it re-confirms that width whenever phase 1
//!    succeeded.
//!
//! The engine does no I/O and no logging. Every probe is recorded in the
//! result so callers can report progress themselves.

use image::DynamicImage;
use serde::Serialize;

use super::request::CompressionRequest;
use crate::errors::{CompressionError, CompressionResult};
use crate::imaging::{OutputFormat, resize_to_width};

/// One trial resample + encode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Probe {
    pub width: u32,
    pub height: u32,
    pub size: usize,
}

/// Encoding produced by a probe
#[derive(Debug, Clone)]
struct Candidate {
    width: u32,
    height: u32,
    bytes: Vec<u8>,
}

/// Winning encoding of a size search
#[derive(Debug, Clone)]
pub struct Compressed {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    /// Every probe in the order it ran
    pub probes: Vec<Probe>,
}

impl Compressed {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Finds the widest encoding of one image that fits a byte budget
pub struct SizeSearchEngine<'a> {
    image: &'a DynamicImage,
    request: CompressionRequest,
    probes: Vec<Probe>,
}

impl<'a> SizeSearchEngine<'a> {
    pub fn new(image: &'a DynamicImage, request: CompressionRequest) -> Self {
        Self {
            image,
            request,
            probes: Vec::new(),
        }
    }

    /// Run both phases and return the winning encoding
    pub fn search(mut self) -> CompressionResult<Compressed> {
        self.request.validate()?;
        if self.image.width() == 0 || self.image.height() == 0 {
            return Err(CompressionError::invalid_request("image has no pixels"));
        }

        let best = self.binary_search()?;
        if best == 0 {
            return Err(self.unattainable());
        }

        let winner = self.linear_refine(best)?;
        Ok(Compressed {
            bytes: winner.bytes,
            width: winner.width,
            height: winner.height,
            format: self.request.format,
            probes: self.probes,
        })
    }

    /// Phase 1. Returns the widest accepted width, or 0 when nothing fit.
    fn binary_search(&mut self) -> CompressionResult<u32> {
        // Empty when the image is narrower than the floor, so nothing fits
        let mut low = self.request.min_width;
        let mut high = self.image.width();
        let mut best = 0;

        while low <= high {
            let mid = low + (high - low) / 2;
            let candidate = self.probe(mid)?;

            if candidate.bytes.len() <= self.request.byte_budget {
                best = mid;
                low = mid + 1;
            } else {
                // mid >= floor >= 1, so this cannot underflow
                high = mid - 1;
            }
        }

        Ok(best)
    }

    /// Phase 2. Walks down from `start` and returns the first width that fits.
    fn linear_refine(&mut self, start: u32) -> CompressionResult<Candidate> {
        let floor = self.request.min_width;
        let step = (start / 20).max(1);
        let mut width = start;

        loop {
            let candidate = self.probe(width)?;
            if candidate.bytes.len() <= self.request.byte_budget {
                return Ok(candidate);
            }

            if width < floor.saturating_add(step) {
                return Err(self.unattainable());
            }
            width -= step;
        }
    }

    /// Resample to `width` and encode. A failed encode aborts the whole search.
    fn probe(&mut self, width: u32) -> CompressionResult<Candidate> {
        let resized = resize_to_width(self.image, width);
        let bytes = self
            .request
            .format
            .encode(&resized, self.request.quality)
            .map_err(|source| CompressionError::Encode { width, source })?;

        self.probes.push(Probe {
            width: resized.width(),
            height: resized.height(),
            size: bytes.len(),
        });

        Ok(Candidate {
            width: resized.width(),
            height: resized.height(),
            bytes,
        })
    }

    fn unattainable(&self) -> CompressionError {
        CompressionError::BudgetUnattainable {
            budget: self.request.byte_budget,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{decode, detect_format};
    use image::{Rgba, RgbaImage};

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([200, 100, 50, 255])))
    }

    fn noisy(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            let v = (x.wrapping_mul(2654435761) ^ y.wrapping_mul(40503)).rotate_left(x % 13) as u8;
            Rgba([v, v.wrapping_mul(7), v ^ 0x5a, 255])
        }))
    }

    #[test]
    fn test_unbounded_budget_keeps_full_width() {
        let img = solid(800, 600);
        let request = CompressionRequest::new(OutputFormat::Jpeg, 80, 10 * 1024 * 1024).with_min_width(50);

        let result = SizeSearchEngine::new(&img, request).search().unwrap();
        assert_eq!(result.width, 800);
        assert_eq!(result.height, 600);
        assert!(result.size() <= request.byte_budget);

        // Phase 2 re-confirms the phase 1 width as its final probe
        let last = result.probes.last().unwrap();
        assert_eq!(last.width, 800);
    }

    #[test]
    fn test_binding_budget_shrinks_width() {
        let img = noisy(400, 300);
        let full = OutputFormat::Png.encode(&img, 85).unwrap().len();
        let budget = full / 3;

        let request = CompressionRequest::new(OutputFormat::Png, 85, budget);
        let result = SizeSearchEngine::new(&img, request).search().unwrap();

        assert!(result.size() <= budget);
        assert!(result.width < 400);
        assert!(result.width >= 100);
        assert_eq!(detect_format(&result.bytes), Some(OutputFormat::Png));
    }

    #[test]
    fn test_binary_search_probe_order() {
        let img = solid(400, 100);
        let request = CompressionRequest::new(OutputFormat::Png, 85, usize::MAX);

        let result = SizeSearchEngine::new(&img, request).search().unwrap();
        let widths: Vec<u32> = result.probes.iter().map(|p| p.width).collect();

        // Everything fits, so low keeps climbing; phase 2 then re-probes 400
        assert_eq!(widths, vec![250, 325, 363, 382, 391, 396, 398, 399, 400, 400]);
    }

    #[test]
    fn test_tiny_budget_is_unattainable() {
        let img = solid(640, 480);
        let request = CompressionRequest::new(OutputFormat::Jpeg, 80, 1);

        let err = SizeSearchEngine::new(&img, request).search().unwrap_err();
        assert!(matches!(err, CompressionError::BudgetUnattainable { budget: 1 }));
    }

    #[test]
    fn test_budget_at_floor_size_succeeds() {
        let img = noisy(300, 200);
        let floor_size = OutputFormat::Jpeg
            .encode(&resize_to_width(&img, 100), 75)
            .unwrap()
            .len();

        let request = CompressionRequest::new(OutputFormat::Jpeg, 75, floor_size);
        let result = SizeSearchEngine::new(&img, request).search().unwrap();
        assert!(result.size() <= floor_size);
        assert!(result.width >= 100);
    }

    #[test]
    fn test_image_narrower_than_floor_is_unattainable() {
        let img = solid(40, 30);
        let request = CompressionRequest::new(OutputFormat::Png, 85, usize::MAX);

        let err = SizeSearchEngine::new(&img, request).search().unwrap_err();
        assert!(matches!(err, CompressionError::BudgetUnattainable { budget: usize::MAX }));
    }

    #[test]
    fn test_image_at_floor_width_is_probed() {
        let img = solid(100, 40);
        let request = CompressionRequest::new(OutputFormat::Png, 85, usize::MAX);

        let result = SizeSearchEngine::new(&img, request).search().unwrap();
        assert_eq!((result.width, result.height), (100, 40));
        assert_eq!(result.probes.len(), 2);
    }

    #[test]
    fn test_result_round_trips() {
        let img = solid(320, 240);

        for format in OutputFormat::ALL {
            let request = CompressionRequest::new(format, 90, 5 * 1024 * 1024);
            let result = SizeSearchEngine::new(&img, request).search().unwrap();

            assert_eq!(detect_format(&result.bytes), Some(format));
            let decoded = decode(&result.bytes).unwrap();
            assert_eq!(decoded.width(), result.width);
        }
    }

    #[test]
    fn test_invalid_request_runs_no_probes() {
        let img = solid(200, 200);
        let request = CompressionRequest::new(OutputFormat::Jpeg, 0, 1000);

        let err = SizeSearchEngine::new(&img, request).search().unwrap_err();
        assert!(matches!(err, CompressionError::InvalidRequest { .. }));
    }
}
