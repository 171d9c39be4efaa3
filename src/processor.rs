//! Unified image processor
//!
//! `ImageProcessor` is the caller-facing layer over the transcoder and the
//! keyer. It owns the caller duties the core leaves out: applying a
//! `TransformConfig`, rejecting images above a pixel ceiling before decoding,
//! and moving the blocking work off an async executor. Both the library
//! facade and the CLI go through it.

use crate::{
    config::{Quality, Tolerance, TransformConfig},
    error::{ImageToolError, Result},
    keyer,
    services::ImageIOService,
    transcoder::{self, CompressionSession},
    types::{CompressionRequest, CompressionResult, EncodedImage, KeyingRequest, KeyingResult},
    utils::NumericValidator,
};
use instant::Instant;
use tracing::{debug, info, instrument};

/// Stateless front door for both transforms
///
/// Holds only configuration; each call owns its own buffers, so one
/// processor can be shared freely between tasks.
#[derive(Debug, Clone, Default)]
pub struct ImageProcessor {
    config: TransformConfig,
}

impl ImageProcessor {
    /// Create a processor after validating `config`
    ///
    /// # Errors
    /// - `InvalidParameter` if the configuration fails validation
    pub fn new(config: TransformConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Compress raw bytes at the configured quality
    ///
    /// # Errors
    /// - `ImageTooLarge` when the header reports more pixels than allowed
    /// - `Decode` / `Encode` from the transcoder
    pub fn compress(&self, bytes: &[u8]) -> Result<CompressionResult> {
        self.compress_with_quality(bytes, self.config.quality)
    }

    /// Compress raw bytes at an explicit quality
    ///
    /// # Errors
    /// - `ImageTooLarge` when the header reports more pixels than allowed
    /// - `Decode` / `Encode` from the transcoder
    #[instrument(skip(self, bytes), fields(bytes = bytes.len(), quality = %quality))]
    pub fn compress_with_quality(&self, bytes: &[u8], quality: Quality) -> Result<CompressionResult> {
        let start = Instant::now();
        let source = self.admit(bytes)?;
        let result = transcoder::transcode(&CompressionRequest { source, quality })?;
        info!(
            original_bytes = result.original_bytes,
            compressed_bytes = result.compressed_bytes,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Compression finished"
        );
        Ok(result)
    }

    /// Remove the background from raw bytes at the configured tolerance
    ///
    /// # Errors
    /// - `ImageTooLarge` when the header reports more pixels than allowed
    /// - `Decode` / `Encode` from the keyer
    pub fn remove_background(&self, bytes: &[u8]) -> Result<KeyingResult> {
        self.remove_background_with_tolerance(bytes, self.config.tolerance)
    }

    /// Remove the background from raw bytes at an explicit tolerance
    ///
    /// # Errors
    /// - `ImageTooLarge` when the header reports more pixels than allowed
    /// - `Decode` / `Encode` from the keyer
    #[instrument(skip(self, bytes), fields(bytes = bytes.len(), tolerance = %tolerance))]
    pub fn remove_background_with_tolerance(
        &self,
        bytes: &[u8],
        tolerance: Tolerance,
    ) -> Result<KeyingResult> {
        let start = Instant::now();
        let source = self.admit(bytes)?;
        let result = keyer::remove_background(&KeyingRequest { source, tolerance })?;
        info!(
            reference = %result.reference_color,
            keyed_pixels = result.keyed_pixels,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Background removal finished"
        );
        Ok(result)
    }

    /// Decode once for repeated re-compression at different qualities
    ///
    /// # Errors
    /// - `ImageTooLarge` when the header reports more pixels than allowed
    /// - `Decode` when the bytes are not an image
    pub fn session(&self, bytes: &[u8]) -> Result<CompressionSession> {
        CompressionSession::new(&self.admit(bytes)?)
    }

    /// Async twin of [`compress`](Self::compress); the work runs on the blocking pool
    ///
    /// # Errors
    /// Same as `compress`, plus `Internal` if the blocking task panics
    pub async fn compress_async(&self, bytes: Vec<u8>) -> Result<CompressionResult> {
        let processor = self.clone();
        run_blocking(move || processor.compress(&bytes)).await
    }

    /// Async twin of [`remove_background`](Self::remove_background)
    ///
    /// # Errors
    /// Same as `remove_background`, plus `Internal` if the blocking task panics
    pub async fn remove_background_async(&self, bytes: Vec<u8>) -> Result<KeyingResult> {
        let processor = self.clone();
        run_blocking(move || processor.remove_background(&bytes)).await
    }

    /// Sniff, then check the pixel ceiling from the header alone
    fn admit(&self, bytes: &[u8]) -> Result<EncodedImage> {
        let source = EncodedImage::sniff(bytes.to_vec())?;
        if self.config.max_pixels.is_some() {
            let (width, height) = ImageIOService::read_dimensions(bytes)?;
            NumericValidator::check_pixel_ceiling(width, height, self.config.max_pixels)?;
            debug!(width, height, "Image admitted under pixel ceiling");
        }
        Ok(source)
    }
}

/// Run a blocking transform on tokio's blocking pool, yielding one result
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ImageToolError::internal(format!("Transform task failed: {}", e)))?
}
