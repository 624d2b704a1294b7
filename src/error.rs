//! Error types for the text-watermark crate.

/// Errors that can occur while validating, rendering, or saving a watermark.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A placement spec field is outside its declared range or set.
    #[error("invalid watermark spec: {field} {reason}")]
    InvalidSpec {
        /// Name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The base image has a zero-sized side.
    #[error("empty canvas ({width}x{height})")]
    EmptyCanvas {
        /// Canvas width in pixels.
        width: u32,
        /// Canvas height in pixels.
        height: u32,
    },

    /// Font data could not be parsed.
    #[error("failed to load font: {0}")]
    Font(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image processing (load, save, encode).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// A spec file or render record could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidSpec {
            field,
            reason: reason.into(),
        }
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let io_err = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io_err.to_string().contains("gone"));

        let unsupported = Error::UnsupportedFormat("tiff".to_string());
        assert!(unsupported.to_string().contains("tiff"));

        let empty = Error::EmptyCanvas {
            width: 0,
            height: 20,
        };
        assert!(empty.to_string().contains("0x20"));

        let invalid = Error::invalid("opacity", "must be within [0.1, 1.0], got 1.5");
        let msg = invalid.to_string();
        assert!(msg.contains("opacity"));
        assert!(msg.contains("1.5"));
    }
}
