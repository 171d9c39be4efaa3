//! Raster encoders for the two output formats
//!
//! - **JPEG**: lossy, used by the transcoder; alpha is flattened onto black
//! - **PNG**: lossless with alpha, used by the keyer
//!
//! Both implement [`RasterEncoder`], which is the seam the transforms encode
//! through. An encoder that yields zero bytes is reported as an
//! `Encode` error rather than handed back as an empty image.

pub mod jpeg_encoder;
pub mod png_encoder;

pub use jpeg_encoder::JpegEncoder;
pub use png_encoder::PngEncoder;

use crate::{
    error::{ImageToolError, Result},
    types::{EncodedImage, ImageFormat, RasterImage},
};

/// Encodes a decoded raster into a compressed byte stream
pub trait RasterEncoder: Send + Sync {
    /// Format tag attached to every output
    fn format(&self) -> ImageFormat;

    /// Encode `raster`
    ///
    /// # Errors
    /// - `Encode` when the backend fails or produces no data
    fn encode(&self, raster: &RasterImage) -> Result<EncodedImage>;
}

/// Wrap backend output, refusing an empty buffer
pub(crate) fn finish(data: Vec<u8>, format: ImageFormat) -> Result<EncodedImage> {
    if data.is_empty() {
        return Err(ImageToolError::encode(format!(
            "{} encoder returned no data",
            format
        )));
    }
    Ok(EncodedImage::new(data, format))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_rejects_empty_output() {
        let err = finish(Vec::new(), ImageFormat::Png).unwrap_err();
        assert!(matches!(err, ImageToolError::Encode(_)));
        assert!(err.to_string().contains("image/png"));

        let ok = finish(vec![1, 2, 3], ImageFormat::Jpeg).unwrap();
        assert_eq!(ok.byte_len(), 3);
        assert_eq!(ok.mime_type(), "image/jpeg");
    }
}
