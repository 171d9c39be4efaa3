//! Numeric validation utilities
//!
//! Overflow-checked buffer arithmetic and the pixel ceiling check for raster
//! dimensions.

use crate::error::{ImageToolError, Result};
use crate::types::CHANNELS;

/// Validator for numeric operations and conversions
pub struct NumericValidator;

impl NumericValidator {
    /// Pixel count of a `width` × `height` raster, computed without overflow
    #[must_use]
    pub fn pixel_count(width: u32, height: u32) -> u64 {
        u64::from(width) * u64::from(height)
    }

    /// Byte length of an RGBA8 buffer for the given dimensions
    pub fn rgba_buffer_len(width: u32, height: u32) -> Result<usize> {
        let bytes = Self::pixel_count(width, height)
            .checked_mul(CHANNELS as u64)
            .ok_or_else(|| {
                ImageToolError::invalid_parameter(format!(
                    "RGBA buffer size overflow for {}x{}",
                    width, height
                ))
            })?;
        Self::validate_u64_to_usize(bytes)
    }

    /// Safely convert u64 to usize with bounds checking
    pub fn validate_u64_to_usize(value: u64) -> Result<usize> {
        usize::try_from(value).map_err(|_| {
            ImageToolError::invalid_parameter(format!(
                "Value {} exceeds usize::MAX on this platform ({})",
                value,
                usize::MAX
            ))
        })
    }

    /// Reject dimensions whose pixel count exceeds `limit`
    pub fn check_pixel_ceiling(width: u32, height: u32, limit: Option<u64>) -> Result<()> {
        let Some(limit) = limit else {
            return Ok(());
        };
        let pixels = Self::pixel_count(width, height);
        if pixels > limit {
            return Err(ImageToolError::ImageTooLarge {
                width,
                height,
                pixels,
                limit,
            });
        }
        Ok(())
    }
}
