//! Codec transcoder: decode, re-encode as JPEG at a quality level, report sizes
//!
//! Every encode starts from the raster decoded from the caller's original
//! bytes. [`CompressionSession`] keeps that raster around so a quality slider
//! can be moved repeatedly without stacking generations of JPEG loss.

use crate::{
    config::Quality,
    encoders::{JpegEncoder, RasterEncoder},
    error::Result,
    services::ImageIOService,
    types::{CompressionRequest, CompressionResult, EncodedImage, RasterImage},
};
use tracing::{debug, instrument};

/// Decode `request.source` and re-encode it as JPEG at `request.quality`
///
/// # Errors
/// - `Decode` when the source is not a decodable image
/// - `Encode` when the JPEG backend fails or yields no data
#[instrument(skip(request), fields(quality = %request.quality, source_bytes = request.source.byte_len()))]
pub fn transcode(request: &CompressionRequest) -> Result<CompressionResult> {
    let raster = ImageIOService::decode(&request.source)?;
    encode_from_original(&raster, request.source.byte_len() as u64, request.quality)
}

/// Encode an already-decoded original at `quality`
///
/// `original_bytes` is the size of the encoded source the raster came from.
///
/// # Errors
/// - `Encode` when the JPEG backend fails or yields no data
pub fn encode_from_original(
    raster: &RasterImage,
    original_bytes: u64,
    quality: Quality,
) -> Result<CompressionResult> {
    encode_with(&JpegEncoder::new(quality), raster, original_bytes)
}

/// Encode through an arbitrary encoder; the size bookkeeping is shared
pub(crate) fn encode_with(
    encoder: &dyn RasterEncoder,
    raster: &RasterImage,
    original_bytes: u64,
) -> Result<CompressionResult> {
    let encoded = encoder.encode(raster)?;
    let compressed_bytes = encoded.byte_len() as u64;
    debug!(
        original_bytes,
        compressed_bytes,
        width = raster.width(),
        height = raster.height(),
        "Transcode complete"
    );
    Ok(CompressionResult {
        encoded,
        original_bytes,
        compressed_bytes,
        dimensions: raster.dimensions(),
    })
}

/// A source decoded once and re-encodable at any quality
///
/// # Examples
/// ```rust,no_run
/// use imgutil::{transcoder::CompressionSession, EncodedImage, Quality};
///
/// # fn example(upload: Vec<u8>) -> imgutil::Result<()> {
/// let session = CompressionSession::new(&EncodedImage::sniff(upload)?)?;
/// let preview = session.compress(Quality::new(80)?)?;
/// let smaller = session.compress(Quality::new(40)?)?;
/// assert_eq!(preview.original_bytes, smaller.original_bytes);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CompressionSession {
    original: RasterImage,
    original_bytes: u64,
}

impl CompressionSession {
    /// Decode the source once
    ///
    /// # Errors
    /// - `Decode` when the source is not a decodable image
    pub fn new(source: &EncodedImage) -> Result<Self> {
        Ok(Self {
            original: ImageIOService::decode(source)?,
            original_bytes: source.byte_len() as u64,
        })
    }

    /// Re-encode the original raster at `quality`
    ///
    /// # Errors
    /// - `Encode` when the JPEG backend fails or yields no data
    pub fn compress(&self, quality: Quality) -> Result<CompressionResult> {
        encode_from_original(&self.original, self.original_bytes, quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{encoders::PngEncoder, error::ImageToolError, types::ImageFormat};

    struct EmptyEncoder;

    impl RasterEncoder for EmptyEncoder {
        fn format(&self) -> ImageFormat {
            ImageFormat::Jpeg
        }

        fn encode(&self, _raster: &RasterImage) -> Result<EncodedImage> {
            crate::encoders::finish(Vec::new(), ImageFormat::Jpeg)
        }
    }

    fn gradient_png(width: u32, height: u32) -> EncodedImage {
        let mut bytes = Vec::new();
        for y in 0..height {
            for x in 0..width {
                bytes.extend_from_slice(&[(x * 8) as u8, (y * 8) as u8, 128, 255]);
            }
        }
        let raster = RasterImage::new(width, height, bytes).unwrap();
        PngEncoder.encode(&raster).unwrap()
    }

    #[test]
    fn test_transcode_reports_sizes_and_dimensions() {
        let source = gradient_png(24, 16);
        let source_len = source.byte_len() as u64;
        let request = CompressionRequest::new(source, 60).unwrap();

        let result = transcode(&request).unwrap();
        assert_eq!(result.original_bytes, source_len);
        assert_eq!(result.compressed_bytes, result.encoded.byte_len() as u64);
        assert_eq!(result.encoded.format(), ImageFormat::Jpeg);
        assert_eq!(result.dimensions, (24, 16));

        let reencoded = ImageIOService::decode(&result.encoded).unwrap();
        assert_eq!(reencoded.dimensions(), (24, 16));
    }

    #[test]
    fn test_transcode_rejects_undecodable_source() {
        let request = CompressionRequest::new(
            EncodedImage::new(vec![0u8; 1000], ImageFormat::Jpeg),
            10,
        )
        .unwrap();
        assert!(matches!(transcode(&request), Err(ImageToolError::Decode(_))));
    }

    #[test]
    fn test_empty_encoder_output_is_encode_error() {
        let raster = RasterImage::filled(2, 2, [0, 0, 0, 255]).unwrap();
        let err = encode_with(&EmptyEncoder, &raster, 10).unwrap_err();
        assert!(matches!(err, ImageToolError::Encode(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_session_is_independent_of_history() {
        let source = gradient_png(32, 32);
        let session = CompressionSession::new(&source).unwrap();

        let _first = session.compress(Quality::new(80).unwrap()).unwrap();
        let after_history = session.compress(Quality::new(40).unwrap()).unwrap();
        let fresh = transcode(&CompressionRequest::new(source, 40).unwrap()).unwrap();

        assert_eq!(after_history.encoded, fresh.encoded);
        assert_eq!(after_history.compressed_bytes, fresh.compressed_bytes);
    }
}
