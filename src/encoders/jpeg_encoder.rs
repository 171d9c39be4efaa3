//! JPEG encoder used by the transcoder
//!
//! JPEG has no alpha channel. Pixels are composited onto opaque black before
//! encoding (`rgb * alpha / 255`), so fully transparent areas come out black
//! and opaque areas are untouched.

use super::{finish, RasterEncoder};
use crate::{
    config::Quality,
    error::{ImageToolError, Result},
    types::{EncodedImage, ImageFormat, RasterImage},
};
use tracing::{instrument, trace};

/// Lossy JPEG encoder at a fixed quality
#[derive(Debug, Clone, Copy)]
pub struct JpegEncoder {
    quality: Quality,
}

impl JpegEncoder {
    #[must_use]
    pub fn new(quality: Quality) -> Self {
        Self { quality }
    }

    #[must_use]
    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Flatten RGBA onto black, producing a packed RGB8 buffer
    pub(crate) fn flatten_onto_black(rgba: &[u8]) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
        for px in rgba.chunks_exact(4) {
            if let [r, g, b, a] = *px {
                let alpha = u16::from(a);
                for channel in [r, g, b] {
                    rgb.push(((u16::from(channel) * alpha + 127) / 255) as u8);
                }
            }
        }
        rgb
    }
}

impl RasterEncoder for JpegEncoder {
    fn format(&self) -> ImageFormat {
        ImageFormat::Jpeg
    }

    #[instrument(skip(self, raster), fields(quality = %self.quality, width = raster.width(), height = raster.height()))]
    fn encode(&self, raster: &RasterImage) -> Result<EncodedImage> {
        let rgb = Self::flatten_onto_black(raster.as_bytes());

        let mut buffer = Vec::new();
        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
            &mut buffer,
            self.quality.encoder_quality(),
        );
        encoder
            .encode(
                &rgb,
                raster.width(),
                raster.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| ImageToolError::encode(format!("JPEG encoding failed: {}", e)))?;

        trace!(bytes = buffer.len(), "JPEG encoded");
        finish(buffer, ImageFormat::Jpeg)
    }
}
