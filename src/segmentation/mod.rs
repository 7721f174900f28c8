//! Segmentation adapter and backends
//!
//! Background removal is an external capability: image bytes in, image bytes
//! with an alpha channel out. The adapter turns that output into a separate
//! color buffer and opacity mask.

pub mod alpha;
pub mod command;
pub mod mask_file;

#[cfg(test)]
pub mod test_utils;

pub use alpha::AlphaMatteBackend;
pub use command::CommandBackend;
pub use mask_file::MaskFileBackend;

use crate::{
    error::{CompositeError, Result},
    types::SegmentedSubject,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Background-removal capability
///
/// Implementations receive the encoded subject photo and return an encoded
/// image whose alpha channel is the subject matte. They carry no state
/// between calls and are never retried.
#[async_trait]
pub trait SegmentationBackend: Send + Sync {
    /// Backend name for logs and reports
    fn name(&self) -> &str;

    /// Remove the background from an encoded image
    ///
    /// # Errors
    /// - The external call fails or produces no output
    async fn remove_background(&self, image_bytes: &[u8]) -> Result<Vec<u8>>;
}

/// Segment a subject photo into color and mask buffers
///
/// # Errors
/// - `Segmentation` if the backend fails, returns nothing, returns bytes that
///   do not decode, or returns an image without an alpha channel
/// - `DimensionMismatch` raised by the backend itself
#[instrument(skip(backend, image_bytes), fields(backend = backend.name(), input_bytes = image_bytes.len()))]
pub async fn segment_subject(
    backend: &dyn SegmentationBackend,
    image_bytes: &[u8],
) -> Result<SegmentedSubject> {
    let output = backend
        .remove_background(image_bytes)
        .await
        .map_err(|e| match e {
            CompositeError::Segmentation(_) | CompositeError::DimensionMismatch { .. } => e,
            other => CompositeError::segmentation_with_backend(backend.name(), &other.to_string()),
        })?;

    if output.is_empty() {
        return Err(CompositeError::segmentation_with_backend(
            backend.name(),
            "returned no image data",
        ));
    }

    let decoded = image::load_from_memory(&output).map_err(|e| {
        CompositeError::segmentation_with_backend(
            backend.name(),
            &format!("returned undecodable image data: {}", e),
        )
    })?;

    if !decoded.color().has_alpha() {
        return Err(CompositeError::segmentation_with_backend(
            backend.name(),
            "returned an image without an alpha channel",
        ));
    }

    let subject = SegmentedSubject::from_rgba(&decoded.to_rgba8());
    debug!(
        width = subject.foreground.width(),
        height = subject.foreground.height(),
        coverage = subject.coverage(),
        "Subject segmented"
    );
    Ok(subject)
}

/// Encode an RGBA image as PNG bytes
pub(crate) fn encode_png(image: &image::RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    image.write_to(&mut buffer, image::ImageFormat::Png)?;
    Ok(buffer.into_inner())
}
