#![allow(clippy::missing_errors_doc)]
#![allow(clippy::uninlined_format_args)]

//! # imgutil
//!
//! Pixel-level image transforms for an image-utility panel: quality-driven
//! JPEG recompression and color-distance background keying.
//!
//! ## Features
//!
//! - **Codec Transcoder**: decode any supported input at native size and
//!   re-encode it as JPEG at quality 1-100, reporting before/after byte counts
//! - **Background Keyer**: sample the top-left pixel as the background color and
//!   zero the alpha of every pixel within a Manhattan RGB distance, emitting PNG
//! - **Format Support**: JPEG, PNG, TIFF and (with `webp-support`) WebP input
//! - **Async and Sync APIs**: blocking transforms, plus async wrappers that run
//!   them on tokio's blocking pool
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imgutil::{compress_bytes, remove_background_from_bytes};
//!
//! # async fn example(upload: Vec<u8>) -> anyhow::Result<()> {
//! let compressed = compress_bytes(&upload, 60).await?;
//! println!("{}", compressed.size_summary());
//! std::fs::write(imgutil::DownloadName::COMPRESSED, compressed.encoded.as_bytes())?;
//!
//! let keyed = remove_background_from_bytes(&upload, 50).await?;
//! println!("background was {}", keyed.reference_color);
//! std::fs::write(imgutil::DownloadName::NO_BACKGROUND, keyed.encoded.as_bytes())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Synchronous core
//!
//! ```rust
//! use imgutil::{keyer, KeyingRequest, PngEncoder, RasterEncoder, RasterImage};
//!
//! let raster = RasterImage::filled(2, 2, [255, 0, 0, 255]).unwrap();
//! let source = PngEncoder.encode(&raster).unwrap();
//! let result = keyer::remove_background(&KeyingRequest::new(source, 10).unwrap()).unwrap();
//! assert_eq!(result.image.transparent_indices(), vec![0, 1, 2, 3]);
//! ```
//!
//! ## Memory
//!
//! Decoding allocates `width × height × 4` bytes. The core functions impose no
//! limit; callers handling untrusted uploads should go through
//! [`ImageProcessor`] with `TransformConfig::max_pixels` set, which rejects
//! oversized images from their header before any pixel memory is committed.
//!
//! ## Logging
//!
//! The library only emits `tracing` events. Install a subscriber in the
//! application to see them; the CLI does so in `tracing_config`.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod encoders;
pub mod error;
pub mod keyer;
pub mod processor;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod transcoder;
pub mod types;
pub mod utils;

use tokio::io::AsyncRead;

// Public API exports
pub use config::{Quality, Tolerance, TransformConfig, DEFAULT_QUALITY, DEFAULT_TOLERANCE, MAX_TOLERANCE};
pub use encoders::{JpegEncoder, PngEncoder, RasterEncoder};
pub use error::{ImageToolError, Result};
pub use keyer::remove_background;
pub use processor::ImageProcessor;
pub use services::{DownloadName, ImageIOService, OutputFormatHandler, OutputKind};
pub use transcoder::{transcode, CompressionSession};
pub use types::{
    CompressionRequest, CompressionResult, EncodedImage, ImageFormat, KeyingRequest,
    KeyingResult, RasterImage, Rgb,
};
pub use utils::format_file_size;

#[cfg(feature = "cli")]
pub use tracing_config::{TracingConfig, TracingFormat};

/// Compress encoded image bytes to JPEG at `quality` (1-100)
///
/// Quality is validated before anything is decoded. Decoding and encoding run
/// on tokio's blocking pool.
///
/// # Examples
///
/// ```rust,no_run
/// use imgutil::compress_bytes;
///
/// # async fn example(upload_bytes: Vec<u8>) -> anyhow::Result<()> {
/// let result = compress_bytes(&upload_bytes, 80).await?;
/// assert_eq!(result.original_bytes, upload_bytes.len() as u64);
/// # Ok(())
/// # }
/// ```
pub async fn compress_bytes(image_bytes: &[u8], quality: i64) -> Result<CompressionResult> {
    let quality = Quality::new(quality)?;
    let config = TransformConfig {
        quality,
        ..TransformConfig::default()
    };
    ImageProcessor::new(config)?
        .compress_async(image_bytes.to_vec())
        .await
}

/// Remove the background from encoded image bytes at `tolerance` (0-765)
///
/// Tolerance is validated before anything is decoded.
///
/// # Examples
///
/// ```rust,no_run
/// use imgutil::remove_background_from_bytes;
///
/// # async fn example(upload_bytes: Vec<u8>) -> anyhow::Result<()> {
/// let result = remove_background_from_bytes(&upload_bytes, 50).await?;
/// let png_bytes = result.encoded.into_bytes();
/// # Ok(())
/// # }
/// ```
pub async fn remove_background_from_bytes(
    image_bytes: &[u8],
    tolerance: i64,
) -> Result<KeyingResult> {
    let tolerance = Tolerance::new(tolerance)?;
    let config = TransformConfig {
        tolerance,
        ..TransformConfig::default()
    };
    ImageProcessor::new(config)?
        .remove_background_async(image_bytes.to_vec())
        .await
}

/// Compress an image read to completion from an async stream
///
/// # Examples
///
/// ```rust,no_run
/// use imgutil::compress_from_reader;
/// use tokio::fs::File;
///
/// # async fn example() -> anyhow::Result<()> {
/// let file = File::open("photo.png").await?;
/// let result = compress_from_reader(file, 40).await?;
/// tokio::fs::write("compressed-image.jpg", result.encoded.as_bytes()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn compress_from_reader<R: AsyncRead + Unpin>(
    reader: R,
    quality: i64,
) -> Result<CompressionResult> {
    Quality::new(quality)?;
    let buffer = read_all(reader).await?;
    compress_bytes(&buffer, quality).await
}

/// Remove the background from an image read to completion from an async stream
pub async fn remove_background_from_reader<R: AsyncRead + Unpin>(
    reader: R,
    tolerance: i64,
) -> Result<KeyingResult> {
    Tolerance::new(tolerance)?;
    let buffer = read_all(reader).await?;
    remove_background_from_bytes(&buffer, tolerance).await
}

async fn read_all<R: AsyncRead + Unpin>(mut reader: R) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut buffer).await?;
    Ok(buffer)
}
