//! Core types for image transform operations

use crate::{
    config::{Quality, Tolerance},
    error::{ImageToolError, Result},
};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Bytes per RGBA pixel
pub const CHANNELS: usize = 4;

/// Image container formats recognised on input; JPEG and PNG are also output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Tiff,
}

impl ImageFormat {
    /// MIME-like tag for this format
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Tiff => "image/tiff",
        }
    }

    /// Parse a MIME type such as `image/png`; parameters after `;` are ignored
    #[must_use]
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::WebP),
            "image/tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    pub(crate) fn to_image_format(self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::WebP => image::ImageFormat::WebP,
            Self::Tiff => image::ImageFormat::Tiff,
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// An RGB triple, used for the sampled reference background color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Sum of absolute per-channel differences (0..=765)
    #[must_use]
    pub fn manhattan_distance(self, other: Self) -> u16 {
        u16::from(self.r.abs_diff(other.r))
            + u16::from(self.g.abs_diff(other.g))
            + u16::from(self.b.abs_diff(other.b))
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Decoded bitmap with an RGBA8 pixel buffer in raster order
///
/// The buffer is never exposed mutably outside the crate; transforms take
/// ownership and hand back a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterImage {
    /// Wrap a raw RGBA buffer, checking dimensions against its length
    ///
    /// # Errors
    /// - `InvalidParameter` for zero dimensions or a buffer that is not
    ///   exactly `width * height * 4` bytes
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ImageToolError::invalid_parameter(format!(
                "Raster dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        let expected = crate::utils::NumericValidator::rgba_buffer_len(width, height)?;
        if pixels.len() != expected {
            return Err(ImageToolError::invalid_parameter(format!(
                "RGBA buffer for {}x{} must be {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Solid-color raster, convenient for fixtures
    ///
    /// # Errors
    /// - `InvalidParameter` for zero dimensions
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        let len = crate::utils::NumericValidator::rgba_buffer_len(width, height)?;
        let pixels = rgba.iter().copied().cycle().take(len).collect();
        Self::new(width, height, pixels)
    }

    /// Convert from an `image` crate buffer
    ///
    /// # Errors
    /// - `Decode` when the buffer has a zero dimension
    pub fn from_rgba_image(image: RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw())
            .map_err(|e| ImageToolError::decode(format!("Decoded image is empty: {}", e)))
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels (width × height)
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.pixels.len() / CHANNELS
    }

    /// Raw RGBA bytes in raster order
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.pixels
    }

    /// RGBA quadruple at a raster index (`y * width + x`)
    #[must_use]
    pub fn pixel(&self, index: usize) -> Option<[u8; 4]> {
        let start = index.checked_mul(CHANNELS)?;
        let px = self.pixels.get(start..start.checked_add(CHANNELS)?)?;
        Some([*px.first()?, *px.get(1)?, *px.get(2)?, *px.get(3)?])
    }

    /// RGBA quadruple at `(x, y)`
    #[must_use]
    pub fn pixel_at(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixel(y as usize * self.width as usize + x as usize)
    }

    /// Iterate over pixels as RGBA chunks
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.pixels.chunks_exact(CHANNELS)
    }

    /// Raster indices of fully transparent pixels
    #[must_use]
    pub fn transparent_indices(&self) -> Vec<usize> {
        self.pixels()
            .enumerate()
            .filter(|(_, px)| px.get(3) == Some(&0))
            .map(|(i, _)| i)
            .collect()
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }
}

/// Compressed image bytes plus their format tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    data: Vec<u8>,
    format: ImageFormat,
}

impl EncodedImage {
    #[must_use]
    pub fn new(data: Vec<u8>, format: ImageFormat) -> Self {
        Self { data, format }
    }

    /// Tag bytes by sniffing their magic number
    ///
    /// # Errors
    /// - `Decode` when the bytes match no supported image signature
    pub fn sniff(data: Vec<u8>) -> Result<Self> {
        let format = crate::services::OutputFormatHandler::detect_format(&data).ok_or_else(|| {
            ImageToolError::decode(format!(
                "Unrecognised image signature ({} bytes)",
                data.len()
            ))
        })?;
        Ok(Self { data, format })
    }

    /// Tag bytes with a declared MIME type, as supplied by an upload widget
    ///
    /// # Errors
    /// - `Decode` when the MIME type is not an `image/*` type this crate reads
    pub fn with_mime_type(data: Vec<u8>, mime: &str) -> Result<Self> {
        let format = ImageFormat::from_mime_type(mime).ok_or_else(|| {
            ImageToolError::decode(format!("Unsupported or non-image MIME type: {}", mime))
        })?;
        Ok(Self { data, format })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    #[must_use]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Input to the transcoder
#[derive(Debug, Clone)]
pub struct CompressionRequest {
    pub source: EncodedImage,
    pub quality: Quality,
}

impl CompressionRequest {
    /// Build a request, rejecting out-of-range quality before any decoding
    ///
    /// # Errors
    /// - `InvalidParameter` when `quality` is outside `1..=100`
    pub fn new(source: EncodedImage, quality: i64) -> Result<Self> {
        Ok(Self {
            source,
            quality: Quality::new(quality)?,
        })
    }
}

/// Output of the transcoder
#[derive(Debug, Clone)]
pub struct CompressionResult {
    /// Newly encoded JPEG
    pub encoded: EncodedImage,
    /// Byte length of the source as supplied
    pub original_bytes: u64,
    /// Byte length of `encoded`; may exceed `original_bytes`
    pub compressed_bytes: u64,
    /// Dimensions of the decoded source, preserved in the output
    pub dimensions: (u32, u32),
}

impl CompressionResult {
    /// Percentage saved, `round((1 - compressed / original) * 100)`
    ///
    /// Negative when the output grew. `None` for an empty source.
    #[must_use]
    pub fn compression_ratio(&self) -> Option<i64> {
        crate::utils::compression_ratio(self.original_bytes, self.compressed_bytes)
    }

    /// One-line human summary of the size change
    #[must_use]
    pub fn size_summary(&self) -> String {
        let ratio = self
            .compression_ratio()
            .map_or_else(|| "n/a".to_string(), |r| format!("{}%", r));
        format!(
            "{} -> {} (saved {})",
            crate::utils::format_file_size(self.original_bytes),
            crate::utils::format_file_size(self.compressed_bytes),
            ratio
        )
    }
}

/// Input to the keyer
#[derive(Debug, Clone)]
pub struct KeyingRequest {
    pub source: EncodedImage,
    pub tolerance: Tolerance,
}

impl KeyingRequest {
    /// Build a request, rejecting out-of-range tolerance before any decoding
    ///
    /// # Errors
    /// - `InvalidParameter` when `tolerance` is negative or above 765
    pub fn new(source: EncodedImage, tolerance: i64) -> Result<Self> {
        Ok(Self {
            source,
            tolerance: Tolerance::new(tolerance)?,
        })
    }

    /// Request with the default tolerance of 50
    #[must_use]
    pub fn with_default_tolerance(source: EncodedImage) -> Self {
        Self {
            source,
            tolerance: Tolerance::default(),
        }
    }
}

/// Output of the keyer
#[derive(Debug, Clone)]
pub struct KeyingResult {
    /// Source raster with alpha zeroed for keyed pixels
    pub image: RasterImage,
    /// Color sampled from pixel 0
    pub reference_color: Rgb,
    /// PNG encoding of `image`
    pub encoded: EncodedImage,
    /// Number of pixels whose alpha this run set to zero
    pub keyed_pixels: usize,
}

impl KeyingResult {
    /// Pixels made transparent by this keying pass
    #[must_use]
    pub fn keyed_pixel_count(&self) -> usize {
        self.keyed_pixels
    }

    /// Share of the output that is fully transparent, in `[0.0, 1.0]`
    #[must_use]
    pub fn transparent_fraction(&self) -> f64 {
        let total = self.image.pixel_count();
        if total == 0 {
            return 0.0;
        }
        self.image.transparent_indices().len() as f64 / total as f64
    }
}
