//! Error types for compositing operations

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for compositing operations
pub type Result<T> = std::result::Result<T, CompositeError>;

/// Error kinds raised by the compositing pipeline
///
/// Every variant is fatal for the stage that raised it. Non-fatal conditions
/// are reported through [`CompositeWarning`] instead.
#[derive(Error, Debug)]
pub enum CompositeError {
    /// Input/output errors (permission denied, disk full, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding or decoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// An input file does not exist
    #[error("Missing input file: {}", .0.display())]
    MissingInputFile(PathBuf),

    /// An input file exists but cannot be decoded as an image
    #[error("Unreadable image '{path}': {reason}")]
    UnreadableImage { path: String, reason: String },

    /// The segmentation collaborator failed or returned undecodable output
    #[error("Segmentation failed: {0}")]
    Segmentation(String),

    /// A configuration value is outside its valid domain
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Two buffers expected to share dimensions do not
    #[error("Dimension mismatch in {context}: expected {}x{}, got {}x{}", .expected.0, .expected.1, .actual.0, .actual.1)]
    DimensionMismatch {
        context: String,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Configuration or report (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CompositeError {
    /// Create a new invalid parameter error
    pub fn invalid_parameter<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a new segmentation error
    pub fn segmentation<S: Into<String>>(msg: S) -> Self {
        Self::Segmentation(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a dimension mismatch error for the named buffer pair
    pub fn dimension_mismatch<S: Into<String>>(
        context: S,
        expected: (u32, u32),
        actual: (u32, u32),
    ) -> Self {
        Self::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<Path>>(
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

    /// Create an unreadable image error with format context
    pub fn unreadable_image<P: AsRef<Path>, E: std::fmt::Display>(path: P, error: E) -> Self {
        let path_ref = path.as_ref();
        let extension = path_ref
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown");

        Self::UnreadableImage {
            path: path_ref.display().to_string(),
            reason: format!(
                "{} (format: {}). Supported formats: PNG, JPEG, TIFF",
                error, extension
            ),
        }
    }

    /// Create configuration error with the valid range spelled out
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::InvalidParameter(format!(
            "Invalid {}: {} (valid range: {})",
            parameter, value, valid_range
        ))
    }

    /// Create segmentation error naming the backend that failed
    pub fn segmentation_with_backend(backend: &str, error: &str) -> Self {
        Self::Segmentation(format!("backend '{}' failed: {}", backend, error))
    }

    /// Whether the error was raised by parameter validation
    #[must_use]
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, Self::InvalidParameter(_))
    }
}

/// Non-fatal conditions raised by a stage that returned its input unchanged
#[derive(Error, Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CompositeWarning {
    /// A masked-statistics calculation found no qualifying pixels
    #[error("Empty mask in stage '{stage}': output passed through unchanged")]
    EmptyMask { stage: String },
}

impl CompositeWarning {
    /// Create an empty-mask warning for the named stage
    pub fn empty_mask<S: Into<String>>(stage: S) -> Self {
        Self::EmptyMask {
            stage: stage.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = CompositeError::invalid_parameter("scale must be positive");
        assert!(matches!(err, CompositeError::InvalidParameter(_)));
        assert!(err.is_invalid_parameter());

        let err = CompositeError::segmentation("model crashed");
        assert!(matches!(err, CompositeError::Segmentation(_)));
        assert!(!err.is_invalid_parameter());
    }

    #[test]
    fn test_error_display() {
        let err = CompositeError::invalid_parameter("opacity out of range");
        assert_eq!(err.to_string(), "Invalid parameter: opacity out of range");

        let err = CompositeError::MissingInputFile(PathBuf::from("input/background.jpg"));
        assert_eq!(err.to_string(), "Missing input file: input/background.jpg");
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let err = CompositeError::dimension_mismatch("mask vs foreground", (800, 600), (640, 480));
        let message = err.to_string();
        assert!(message.contains("mask vs foreground"));
        assert!(message.contains("800x600"));
        assert!(message.contains("640x480"));
    }

    #[test]
    fn test_enhanced_error_context() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = CompositeError::file_io_error("write composite", Path::new("/out/final.jpg"), &io_error);
        let error_string = err.to_string();
        assert!(error_string.contains("write composite"));
        assert!(error_string.contains("/out/final.jpg"));

        let err = CompositeError::config_value_error("shadow opacity", 1.5, "0.0-1.0");
        let error_string = err.to_string();
        assert!(error_string.contains("shadow opacity"));
        assert!(error_string.contains("1.5"));
        assert!(error_string.contains("0.0-1.0"));

        let err = CompositeError::unreadable_image(Path::new("input/person.jpg"), "bad header");
        let error_string = err.to_string();
        assert!(error_string.contains("input/person.jpg"));
        assert!(error_string.contains("format: jpg"));

        let err = CompositeError::segmentation_with_backend("command", "exit status 1");
        assert!(err.to_string().contains("backend 'command' failed"));
    }

    #[test]
    fn test_warning_display() {
        let warning = CompositeWarning::empty_mask("harmonization");
        assert!(warning.to_string().contains("harmonization"));
    }
}
