//! Format detection and output naming service
//!
//! Keeps format sniffing and file-naming conventions out of the transform
//! code so the transcoder and keyer only ever see bytes and rasters.

use crate::types::ImageFormat;
use std::path::{Path, PathBuf};

/// Conventional download names offered by the UI collaborator
pub struct DownloadName;

impl DownloadName {
    /// Name for the transcoder's JPEG output
    pub const COMPRESSED: &'static str = "compressed-image.jpg";
    /// Name for the keyer's PNG output
    pub const NO_BACKGROUND: &'static str = "no-background.png";
}

/// Which transform produced an output, for naming purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Compressed,
    NoBackground,
}

impl OutputKind {
    /// Format every output of this kind is encoded as
    #[must_use]
    pub fn format(self) -> ImageFormat {
        match self {
            Self::Compressed => ImageFormat::Jpeg,
            Self::NoBackground => ImageFormat::Png,
        }
    }

    /// Download name used when a single image is processed
    #[must_use]
    pub fn default_file_name(self) -> &'static str {
        match self {
            Self::Compressed => DownloadName::COMPRESSED,
            Self::NoBackground => DownloadName::NO_BACKGROUND,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Compressed => "compressed",
            Self::NoBackground => "no_background",
        }
    }

    const ALL: [Self; 2] = [Self::Compressed, Self::NoBackground];
}

/// Service for format sniffing and output naming
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Detect image format from binary data by examining magic bytes
    ///
    /// # Examples
    /// ```rust
    /// use imgutil::{services::OutputFormatHandler, ImageFormat};
    ///
    /// let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    /// assert_eq!(OutputFormatHandler::detect_format(&png), Some(ImageFormat::Png));
    /// assert_eq!(OutputFormatHandler::detect_format(b"hello"), None);
    /// ```
    #[must_use]
    pub fn detect_format(data: &[u8]) -> Option<ImageFormat> {
        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data
            .get(0..8)
            .is_some_and(|slice| slice == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])
        {
            return Some(ImageFormat::Png);
        }

        // JPEG: FF D8 FF
        if data
            .get(0..3)
            .is_some_and(|slice| slice == [0xFF, 0xD8, 0xFF])
        {
            return Some(ImageFormat::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.get(0..4).is_some_and(|slice| slice == b"RIFF")
            && data.get(8..12).is_some_and(|slice| slice == b"WEBP")
        {
            return Some(ImageFormat::WebP);
        }

        // TIFF, little or big endian
        if data
            .get(0..4)
            .is_some_and(|slice| slice == [0x49, 0x49, 0x2A, 0x00] || slice == [0x4D, 0x4D, 0x00, 0x2A])
        {
            return Some(ImageFormat::Tiff);
        }

        None
    }

    /// File extension for a format (without the dot)
    #[must_use]
    pub fn get_extension(format: ImageFormat) -> &'static str {
        match format {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::WebP => "webp",
            ImageFormat::Tiff => "tiff",
        }
    }

    /// Guess a format from a path's extension
    #[must_use]
    pub fn format_from_path(path: &Path) -> Option<ImageFormat> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "webp" => Some(ImageFormat::WebP),
            "tif" | "tiff" => Some(ImageFormat::Tiff),
            _ => None,
        }
    }

    /// Whether a path looks like an image this crate can read
    #[must_use]
    pub fn is_supported_input(path: &Path) -> bool {
        match Self::format_from_path(path) {
            Some(ImageFormat::WebP) => cfg!(feature = "webp-support"),
            Some(_) => true,
            None => false,
        }
    }

    /// Output file name for one input of a batch, e.g. `cat_no_background.png`
    #[must_use]
    pub fn batch_file_name(input_path: &Path, kind: OutputKind) -> String {
        let stem = input_path
            .file_stem()
            .map_or_else(|| "image".into(), |s| s.to_string_lossy());
        format!(
            "{}_{}.{}",
            stem,
            kind.suffix(),
            Self::get_extension(kind.format())
        )
    }

    /// Batch output name that keeps the source extension, e.g. `cat_png_compressed.jpg`
    ///
    /// Used when two inputs share a stem and would otherwise land on the same file.
    #[must_use]
    pub fn qualified_batch_file_name(input_path: &Path, kind: OutputKind) -> String {
        let stem = input_path
            .file_stem()
            .map_or_else(|| "image".into(), |s| s.to_string_lossy());
        match input_path.extension() {
            Some(ext) => format!(
                "{}_{}_{}.{}",
                stem,
                ext.to_string_lossy().to_ascii_lowercase(),
                kind.suffix(),
                Self::get_extension(kind.format())
            ),
            None => Self::batch_file_name(input_path, kind),
        }
    }

    /// Full output path inside `output_dir` for one input of a batch
    #[must_use]
    pub fn batch_output_path(input_path: &Path, output_dir: &Path, kind: OutputKind) -> PathBuf {
        output_dir.join(Self::batch_file_name(input_path, kind))
    }

    /// Whether a file name carries one of the batch output suffixes, i.e. it
    /// was most likely written by an earlier batch run
    #[must_use]
    pub fn is_generated_output(path: &Path) -> bool {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            return false;
        };
        OutputKind::ALL.iter().any(|kind| {
            stem.strip_suffix(kind.suffix())
                .is_some_and(|rest| rest.ends_with('_') && rest.len() > 1)
        })
    }
}
