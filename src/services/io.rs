//! Image decode and file I/O service
//!
//! Decoding lives here so that both transforms share one definition of
//! "decodable": anything the `image` crate can turn into a non-empty RGBA8
//! raster. File access is only used by the CLI; the transforms themselves
//! never touch the file system.

use crate::{
    error::{ImageToolError, Result},
    services::OutputFormatHandler,
    types::{EncodedImage, ImageFormat, RasterImage},
};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, instrument};

/// Service for decoding images and moving encoded bytes in and out of files
pub struct ImageIOService;

impl ImageIOService {
    /// Decode an encoded image into an RGBA raster at its native dimensions
    ///
    /// The declared format tag is used first; if the bytes disagree with it,
    /// content sniffing decides. Nothing is resized.
    ///
    /// # Errors
    /// - `Decode` for empty, corrupt, truncated or unsupported input
    #[instrument(skip(encoded), fields(format = %encoded.format(), bytes = encoded.byte_len()))]
    pub fn decode(encoded: &EncodedImage) -> Result<RasterImage> {
        if encoded.is_empty() {
            return Err(ImageToolError::decode("Input contains no bytes"));
        }

        let declared = encoded.format().to_image_format();
        let dynamic = Self::decode_unlimited(encoded.as_bytes(), Some(declared)).or_else(
            |declared_err| {
                debug!(
                    "Declared-format decode failed: {}. Attempting content-based detection.",
                    declared_err
                );
                Self::decode_unlimited(encoded.as_bytes(), None).map_err(|content_err| {
                    ImageToolError::decode(format!(
                        "Failed to decode {} bytes as {}: {}; content detection: {}",
                        encoded.byte_len(),
                        encoded.format(),
                        declared_err,
                        content_err
                    ))
                })
            },
        )?;

        let raster = RasterImage::from_rgba_image(dynamic.into_rgba8())?;
        debug!(
            width = raster.width(),
            height = raster.height(),
            "Image decoded"
        );
        Ok(raster)
    }

    /// Decode with the `image` crate's allocation limits switched off
    ///
    /// Pixel ceilings belong to the caller (`ImageProcessor` checks
    /// `max_pixels` from the header); a valid image is never a decode error
    /// because of its size. `format` of `None` guesses from content.
    fn decode_unlimited(
        data: &[u8],
        format: Option<image::ImageFormat>,
    ) -> image::ImageResult<image::DynamicImage> {
        let mut reader = match format {
            Some(format) => image::ImageReader::with_format(Cursor::new(data), format),
            None => image::ImageReader::new(Cursor::new(data)).with_guessed_format()?,
        };
        reader.no_limits();
        reader.decode()
    }

    /// Decode raw bytes whose format is discovered by sniffing
    ///
    /// # Errors
    /// - `Decode` when the bytes are not a supported image
    pub fn decode_bytes(data: &[u8]) -> Result<RasterImage> {
        Self::decode(&EncodedImage::sniff(data.to_vec())?)
    }

    /// Read only the image header and return `(width, height)`
    ///
    /// Used to enforce a pixel ceiling before committing memory to a full decode.
    ///
    /// # Errors
    /// - `Decode` when the header cannot be parsed
    pub fn read_dimensions(data: &[u8]) -> Result<(u32, u32)> {
        let reader = image::ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ImageToolError::decode(format!("Failed to read image header: {}", e)))?;
        reader
            .into_dimensions()
            .map_err(|e| ImageToolError::decode(format!("Failed to read image dimensions: {}", e)))
    }

    /// Load an encoded image from a file path, tagging it by content
    ///
    /// Falls back to the file extension when the magic bytes are unknown, so
    /// the eventual decode error names the format the user expected.
    ///
    /// # Errors
    /// - `Io` when the file cannot be read
    /// - `Decode` when neither content nor extension identify an image
    pub fn load_encoded<P: AsRef<Path>>(path: P) -> Result<EncodedImage> {
        let path_ref = path.as_ref();
        let data = std::fs::read(path_ref)
            .map_err(|e| ImageToolError::file_io_error("read image file", path_ref, &e))?;

        if let Some(format) = OutputFormatHandler::detect_format(&data) {
            if !Self::extension_matches(path_ref, format) {
                debug!(
                    "Content of {} is {}; ignoring its file extension",
                    path_ref.display(),
                    format
                );
            }
            return Ok(EncodedImage::new(data, format));
        }

        let format = OutputFormatHandler::format_from_path(path_ref).ok_or_else(|| {
            ImageToolError::decode(format!(
                "Unrecognised image data in '{}' ({} bytes)",
                path_ref.display(),
                data.len()
            ))
        })?;
        debug!(
            "Content sniffing failed for {}; using extension-derived format {}",
            path_ref.display(),
            format
        );
        Ok(EncodedImage::new(data, format))
    }

    /// Write encoded bytes to a file, creating parent directories as needed
    ///
    /// # Errors
    /// - `Io` when the directory or file cannot be written
    pub fn save_encoded<P: AsRef<Path>>(encoded: &EncodedImage, path: P) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ImageToolError::file_io_error("create output directory", parent, &e)
            })?;
        }

        std::fs::write(path_ref, encoded.as_bytes())
            .map_err(|e| ImageToolError::file_io_error("write image file", path_ref, &e))?;
        debug!(
            path = %path_ref.display(),
            bytes = encoded.byte_len(),
            format = %encoded.format(),
            "Image written"
        );
        Ok(())
    }

    /// Whether a decoded format tag matches what the file extension claims
    #[must_use]
    pub fn extension_matches(path: &Path, format: ImageFormat) -> bool {
        OutputFormatHandler::format_from_path(path) == Some(format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageEncoder, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut buffer = Vec::new();
        image::codecs::png::PngEncoder::new(&mut buffer)
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
            .unwrap();
        buffer
    }

    #[test]
    fn test_decode_png() {
        let encoded = EncodedImage::new(png_bytes(3, 2), ImageFormat::Png);
        let raster = ImageIOService::decode(&encoded).unwrap();
        assert_eq!(raster.dimensions(), (3, 2));
        assert_eq!(raster.pixel(0), Some([10, 20, 30, 255]));
    }

    #[test]
    fn test_decode_with_wrong_declared_format_falls_back_to_content() {
        let encoded = EncodedImage::new(png_bytes(2, 2), ImageFormat::Jpeg);
        let raster = ImageIOService::decode(&encoded).unwrap();
        assert_eq!(raster.dimensions(), (2, 2));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let encoded = EncodedImage::new(b"definitely not an image".to_vec(), ImageFormat::Png);
        assert!(matches!(
            ImageIOService::decode(&encoded),
            Err(ImageToolError::Decode(_))
        ));

        let empty = EncodedImage::new(Vec::new(), ImageFormat::Jpeg);
        assert!(matches!(
            ImageIOService::decode(&empty),
            Err(ImageToolError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_png() {
        let mut bytes = png_bytes(8, 8);
        bytes.truncate(bytes.len() / 2);
        let encoded = EncodedImage::new(bytes, ImageFormat::Png);
        assert!(matches!(
            ImageIOService::decode(&encoded),
            Err(ImageToolError::Decode(_))
        ));
    }

    /// A PNG whose header claims `width` × `height` but whose data is a single 1×1 row
    fn png_with_claimed_size(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = png_bytes(1, 1);
        // IHDR: length(8..12) type(12..16) width(16..20) height(20..24) ... crc(29..33)
        bytes[16..20].copy_from_slice(&width.to_be_bytes());
        bytes[20..24].copy_from_slice(&height.to_be_bytes());
        let crc = crc32fast::hash(&bytes[12..29]);
        bytes[29..33].copy_from_slice(&crc.to_be_bytes());
        bytes
    }

    #[test]
    fn test_decode_applies_no_allocation_limit() {
        // 11600 × 11600 RGBA is past the codec library's default 512 MiB
        // allocation cap. Only the truncated data may fail the decode.
        let encoded = EncodedImage::new(png_with_claimed_size(11_600, 11_600), ImageFormat::Png);
        assert_eq!(
            ImageIOService::read_dimensions(encoded.as_bytes()).unwrap(),
            (11_600, 11_600)
        );

        match ImageIOService::decode(&encoded) {
            Err(ImageToolError::Decode(message)) => {
                assert!(
                    !message.to_ascii_lowercase().contains("limit"),
                    "decode hit an allocation limit: {}",
                    message
                );
            },
            other => panic!(
                "expected a truncated-data decode error, got {:?}",
                other.map(|r| r.dimensions())
            ),
        }
    }

    #[test]
    #[ignore = "allocates over 1 GiB"]
    fn test_decode_image_above_default_allocation_cap() {
        use image::codecs::png::{CompressionType, FilterType};

        let (width, height) = (11_600u32, 11_600u32);
        let pixels = vec![0u8; width as usize * height as usize * 4];
        let mut buffer = Vec::new();
        image::codecs::png::PngEncoder::new_with_quality(
            &mut buffer,
            CompressionType::Fast,
            FilterType::NoFilter,
        )
        .write_image(&pixels, width, height, image::ExtendedColorType::Rgba8)
        .unwrap();
        drop(pixels);

        let raster = ImageIOService::decode(&EncodedImage::new(buffer, ImageFormat::Png)).unwrap();
        assert_eq!(raster.dimensions(), (width, height));
    }

    #[test]
    fn test_read_dimensions() {
        assert_eq!(ImageIOService::read_dimensions(&png_bytes(7, 5)).unwrap(), (7, 5));
        assert!(ImageIOService::read_dimensions(b"nope").is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("out.png");
        let encoded = EncodedImage::new(png_bytes(2, 2), ImageFormat::Png);

        ImageIOService::save_encoded(&encoded, &path).unwrap();
        let loaded = ImageIOService::load_encoded(&path).unwrap();
        assert_eq!(loaded, encoded);
        assert!(ImageIOService::extension_matches(&path, loaded.format()));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = ImageIOService::load_encoded(temp_dir.path().join("missing.png")).unwrap_err();
        assert!(matches!(err, ImageToolError::Io(_)));
    }
}
