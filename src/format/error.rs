//! Error types for label-file operations.

use thiserror::Error;

/// Errors that can occur while reading or writing label files.
///
/// Malformed lines are not errors; they are skipped and counted in
/// [`super::DecodeReport::malformed_lines`].
#[derive(Error, Debug)]
pub enum FormatError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Normalization needs a non-empty image
    #[error("Invalid image dimensions {width}x{height}")]
    InvalidDimensions {
        /// Image width in pixels
        width: u32,
        /// Image height in pixels
        height: u32,
    },
}

impl FormatError {
    /// Reject zero-sized images.
    pub(crate) fn check_dimensions(width: u32, height: u32) -> Result<(f64, f64), Self> {
        if width == 0 || height == 0 {
            return Err(Self::InvalidDimensions { width, height });
        }
        Ok((f64::from(width), f64::from(height)))
    }
}
