//! Configuration types for image transform operations

use crate::error::{ImageToolError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default lossy quality used by the upload panel's slider
pub const DEFAULT_QUALITY: u8 = 80;

/// Default keying tolerance (Manhattan RGB distance)
pub const DEFAULT_TOLERANCE: u16 = 50;

/// Largest possible Manhattan distance between two RGB colors (3 × 255)
pub const MAX_TOLERANCE: u16 = 765;

/// Lossy encoder quality in `1..=100`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Quality(u8);

impl Quality {
    /// Validate a user-supplied quality value
    ///
    /// # Errors
    /// - `InvalidParameter` when `value` is outside `1..=100`
    pub fn new(value: i64) -> Result<Self> {
        if (1..=100).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ImageToolError::parameter_value_error(
                "quality",
                value,
                "1-100",
                Some(i64::from(DEFAULT_QUALITY)),
            ))
        }
    }

    /// Quality clamped into range instead of rejected
    #[must_use]
    pub fn saturating(value: i64) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }

    /// Linear mapping onto the `[0.0, 1.0]` encoder scale
    #[must_use]
    pub fn as_factor(self) -> f32 {
        f32::from(self.0) / 100.0
    }

    /// Quality expressed on the JPEG encoder's integer `1..=100` scale
    #[must_use]
    pub fn encoder_quality(self) -> u8 {
        (self.as_factor() * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(DEFAULT_QUALITY)
    }
}

impl TryFrom<i64> for Quality {
    type Error = ImageToolError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Keying tolerance: pixels with a Manhattan RGB distance strictly below this
/// value are made transparent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u16")]
pub struct Tolerance(u16);

impl Tolerance {
    /// Validate a user-supplied tolerance value
    ///
    /// # Errors
    /// - `InvalidParameter` when `value` is negative or above 765
    pub fn new(value: i64) -> Result<Self> {
        if (0..=i64::from(MAX_TOLERANCE)).contains(&value) {
            Ok(Self(value as u16))
        } else {
            Err(ImageToolError::parameter_value_error(
                "tolerance",
                value,
                "0-765",
                Some(i64::from(DEFAULT_TOLERANCE)),
            ))
        }
    }

    #[must_use]
    pub fn saturating(value: i64) -> Self {
        Self(value.clamp(0, i64::from(MAX_TOLERANCE)) as u16)
    }

    #[must_use]
    pub fn get(self) -> u16 {
        self.0
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self(DEFAULT_TOLERANCE)
    }
}

impl TryFrom<i64> for Tolerance {
    type Error = ImageToolError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Tolerance> for u16 {
    fn from(tolerance: Tolerance) -> Self {
        tolerance.0
    }
}

impl std::fmt::Display for Tolerance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration shared by the processor facade and the CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// JPEG quality used by the transcoder
    pub quality: Quality,

    /// Manhattan distance threshold used by the keyer
    pub tolerance: Tolerance,

    /// Reject inputs whose width × height exceeds this many pixels (None = no ceiling)
    pub max_pixels: Option<u64>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            tolerance: Tolerance::default(),
            max_pixels: None,
        }
    }
}

impl TransformConfig {
    /// Create a new configuration builder for fluent API construction
    ///
    /// # Examples
    ///
    /// ```rust
    /// use imgutil::TransformConfig;
    ///
    /// let config = TransformConfig::builder()
    ///     .quality(40)
    ///     .tolerance(30)
    ///     .max_pixels(50_000_000)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.quality.get(), 40);
    /// ```
    #[must_use]
    pub fn builder() -> TransformConfigBuilder {
        TransformConfigBuilder::default()
    }

    /// Parse a configuration from JSON; missing fields take their defaults
    ///
    /// # Errors
    /// - `InvalidParameter` for malformed JSON or out-of-range values
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            ImageToolError::invalid_parameter(format!("Invalid configuration JSON: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file in JSON format
    ///
    /// # Errors
    /// - `Io` when the file cannot be read
    /// - `InvalidParameter` for malformed or out-of-range contents
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ImageToolError::file_io_error("read configuration file", path, &e))?;
        Self::from_json_str(&content)
    }

    /// Validate all configuration parameters
    ///
    /// Quality and tolerance are range-checked on construction, so only the
    /// pixel ceiling remains: a ceiling of zero would reject every image.
    pub fn validate(&self) -> Result<()> {
        if self.max_pixels == Some(0) {
            return Err(ImageToolError::parameter_value_error(
                "max_pixels",
                0,
                "1 or more",
                None,
            ));
        }
        Ok(())
    }
}

/// Builder for `TransformConfig`
#[derive(Debug, Default)]
pub struct TransformConfigBuilder {
    config: TransformConfig,
}

impl TransformConfigBuilder {
    /// Set JPEG quality (clamped to 1-100)
    #[must_use]
    pub fn quality(mut self, quality: i64) -> Self {
        self.config.quality = Quality::saturating(quality);
        self
    }

    /// Set keying tolerance (clamped to 0-765)
    #[must_use]
    pub fn tolerance(mut self, tolerance: i64) -> Self {
        self.config.tolerance = Tolerance::saturating(tolerance);
        self
    }

    /// Set the pixel ceiling applied before decoding
    #[must_use]
    pub fn max_pixels(mut self, max_pixels: u64) -> Self {
        self.config.max_pixels = Some(max_pixels);
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// - `InvalidParameter` if the assembled configuration fails validation
    pub fn build(self) -> Result<TransformConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
