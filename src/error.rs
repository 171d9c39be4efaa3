//! Error types for image transform operations

use thiserror::Error;

/// Result type alias for image transform operations
pub type Result<T> = std::result::Result<T, ImageToolError>;

/// Error types for the transcoder, the keyer and their callers
#[derive(Error, Debug)]
pub enum ImageToolError {
    /// Input bytes are not a decodable raster image (corrupt, truncated, unsupported)
    #[error("Decode error: {0}")]
    Decode(String),

    /// The encoder produced no output for a valid decoded image
    #[error("Encode error: {0}")]
    Encode(String),

    /// Quality or tolerance outside its valid range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Image dimensions exceed the caller's configured pixel ceiling
    #[error("Image too large: {width}x{height} ({pixels} pixels) exceeds limit of {limit} pixels")]
    ImageTooLarge {
        width: u32,
        height: u32,
        pixels: u64,
        limit: u64,
    },

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ImageToolError {
    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new encode error
    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Self::Encode(msg.into())
    }

    /// Create a new invalid parameter error
    pub fn invalid_parameter<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create parameter error with valid range and optional recommendation
    pub fn parameter_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidParameter(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Whether a second attempt with the same input may succeed.
    ///
    /// Encoder and I/O failures qualify; bad input or bad parameters fail
    /// the same way every time.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Encode(_) | Self::Io(_))
    }
}
