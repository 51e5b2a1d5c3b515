//! Error types for the watermark-restore crate.

/// Errors that can occur while loading alpha maps or restoring images.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A reference bitmap could not be decoded into an alpha map.
    #[error("failed to decode alpha map: {0}")]
    AlphaMapDecode(image::ImageError),

    /// A reference bitmap decoded fine but is not a supported watermark footprint.
    #[error("alpha map must be 48x48 or 96x96, got {width}x{height}")]
    InvalidAlphaMap {
        /// Bitmap width in pixels.
        width: u32,
        /// Bitmap height in pixels.
        height: u32,
    },

    /// An alpha map was supplied for the wrong watermark variant.
    #[error("expected a {expected}x{expected} alpha map, got {actual}x{actual}")]
    AlphaMapSizeMismatch {
        /// Side length the variant requires.
        expected: u32,
        /// Side length of the supplied map.
        actual: u32,
    },

    /// `restore` was called before the engine was successfully initialized.
    #[error("watermark engine is not initialized")]
    EngineNotReady,

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image processing (load, save, encode).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Whether this error means the reference bitmaps could not be loaded.
    #[must_use]
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::AlphaMapDecode(_)
                | Self::InvalidAlphaMap { .. }
                | Self::AlphaMapSizeMismatch { .. }
                | Self::Io(_)
        )
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

        let invalid = Error::InvalidAlphaMap {
            width: 10,
            height: 20,
        };
        assert!(invalid.to_string().contains("10x20"));

        let mismatch = Error::AlphaMapSizeMismatch {
            expected: 96,
            actual: 48,
        };
        let msg = mismatch.to_string();
        assert!(msg.contains("96x96"));
        assert!(msg.contains("48x48"));

        assert!(Error::EngineNotReady.to_string().contains("not initialized"));
    }

    #[test]
    fn load_errors_are_classified() {
        assert!(Error::InvalidAlphaMap {
            width: 1,
            height: 1
        }
        .is_load_error());
        assert!(Error::Io(std::io::Error::other("x")).is_load_error());
        assert!(!Error::EngineNotReady.is_load_error());
        assert!(!Error::UnsupportedFormat("gif".into()).is_load_error());
    }
}
