//! PNG encoder used by the keyer
//!
//! Writes RGBA8 so keyed alpha survives intact.

use super::{finish, RasterEncoder};
use crate::{
    error::{ImageToolError, Result},
    types::{EncodedImage, ImageFormat, RasterImage},
};
use image::ImageEncoder;
use tracing::{instrument, trace};

/// Lossless RGBA PNG encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct PngEncoder;

impl RasterEncoder for PngEncoder {
    fn format(&self) -> ImageFormat {
        ImageFormat::Png
    }

    #[instrument(skip(self, raster), fields(width = raster.width(), height = raster.height()))]
    fn encode(&self, raster: &RasterImage) -> Result<EncodedImage> {
        let mut buffer = Vec::new();
        image::codecs::png::PngEncoder::new(&mut buffer)
            .write_image(
                raster.as_bytes(),
                raster.width(),
                raster.height(),
                image::ExtendedColorType::Rgba8,
            )
            .map_err(|e| ImageToolError::encode(format!("PNG encoding failed: {}", e)))?;

        trace!(bytes = buffer.len(), "PNG encoded");
        finish(buffer, ImageFormat::Png)
    }
}
