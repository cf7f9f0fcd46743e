use serde::{Deserialize, Serialize};

use crate::errors::{CompressionError, CompressionResult};
use crate::imaging::OutputFormat;

/// Narrowest width the search will try, in pixels
pub const MIN_WIDTH_FLOOR: u32 = 100;

/// Budget used when the caller does not give one (1 MiB)
pub const DEFAULT_MAX_SIZE: usize = 1_048_576;

/// JPEG quality used when the caller does not give one
pub const DEFAULT_QUALITY: u8 = 85;

/// Constraints for one size search. Immutable while the search runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionRequest {
    pub format: OutputFormat,
    /// 1-100, only meaningful for jpeg
    pub quality: u8,
    /// Maximum encoded size in bytes
    pub byte_budget: usize,
    pub min_width: u32,
}

impl CompressionRequest {
    pub fn new(format: OutputFormat, quality: u8, byte_budget: usize) -> Self {
        Self {
            format,
            quality,
            byte_budget,
            min_width: MIN_WIDTH_FLOOR,
        }
    }

    pub fn with_min_width(mut self, min_width: u32) -> Self {
        self.min_width = min_width;
        self
    }

    /// Reject parameters outside their ranges before any probe runs
    pub fn validate(&self) -> CompressionResult<()> {
        if self.byte_budget == 0 {
            return Err(CompressionError::invalid_request("byte budget must be greater than 0"));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(CompressionError::invalid_request(format!(
                "quality must be between 1 and 100 inclusive, got {}",
                self.quality
            )));
        }
        if self.min_width == 0 {
            return Err(CompressionError::invalid_request("minimum width must be at least 1"));
        }
        Ok(())
    }
}

impl Default for CompressionRequest {
    fn default() -> Self {
        Self::new(OutputFormat::Jpeg, DEFAULT_QUALITY, DEFAULT_MAX_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_request_is_valid() {
        let request = CompressionRequest::default();
        assert_eq!(request.byte_budget, 1_048_576);
        assert_eq!(request.quality, 85);
        assert_eq!(request.min_width, 100);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let base = CompressionRequest::default();

        let zero_budget = CompressionRequest { byte_budget: 0, ..base };
        assert!(matches!(zero_budget.validate(), Err(CompressionError::InvalidRequest { .. })));

        let zero_quality = CompressionRequest { quality: 0, ..base };
        assert!(zero_quality.validate().is_err());

        let high_quality = CompressionRequest { quality: 101, ..base };
        assert!(high_quality.validate().is_err());

        assert!(base.with_min_width(0).validate().is_err());
    }
}
