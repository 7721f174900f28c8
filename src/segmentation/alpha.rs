//! Backend for subjects that already carry an alpha matte

use super::SegmentationBackend;
use crate::error::{CompositeError, Result};
use async_trait::async_trait;

/// Uses the subject image's own alpha channel as the matte
///
/// Suited to pre-cut PNG subjects. Inputs without alpha are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlphaMatteBackend;

impl AlphaMatteBackend {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SegmentationBackend for AlphaMatteBackend {
    fn name(&self) -> &str {
        "alpha"
    }

    async fn remove_background(&self, image_bytes: &[u8]) -> Result<Vec<u8>> {
        let image = image::load_from_memory(image_bytes)
            .map_err(|e| CompositeError::segmentation(format!("cannot decode subject: {}", e)))?;

        if !image.color().has_alpha() {
            return Err(CompositeError::segmentation(
                "subject has no alpha channel; provide a pre-cut PNG or choose another segmenter",
            ));
        }

        Ok(image_bytes.to_vec())
    }
}
