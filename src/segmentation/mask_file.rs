//! Backend combining the subject with a hand-provided mask file

use super::{encode_png, SegmentationBackend};
use crate::error::{CompositeError, Result};
use async_trait::async_trait;
use image::{DynamicImage, GrayImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads an opacity mask from disk and attaches it to the subject
///
/// A mask with an alpha channel contributes its alpha; otherwise its
/// luminance is used.
#[derive(Debug, Clone)]
pub struct MaskFileBackend {
    mask_path: PathBuf,
}

impl MaskFileBackend {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(mask_path: P) -> Self {
        Self {
            mask_path: mask_path.into(),
        }
    }

    #[must_use]
    pub fn mask_path(&self) -> &Path {
        &self.mask_path
    }

    fn mask_channel(mask: &DynamicImage) -> GrayImage {
        if mask.color().has_alpha() {
            let rgba = mask.to_rgba8();
            GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
                image::Luma([rgba.get_pixel(x, y).0[3]])
            })
        } else {
            mask.to_luma8()
        }
    }
}

#[async_trait]
impl SegmentationBackend for MaskFileBackend {
    fn name(&self) -> &str {
        "mask-file"
    }

    async fn remove_background(&self, image_bytes: &[u8]) -> Result<Vec<u8>> {
        let mask_bytes = tokio::fs::read(&self.mask_path).await.map_err(|e| {
            CompositeError::segmentation(format!(
                "cannot read mask '{}': {}",
                self.mask_path.display(),
                e
            ))
        })?;

        let subject = image::load_from_memory(image_bytes)
            .map_err(|e| CompositeError::segmentation(format!("cannot decode subject: {}", e)))?
            .to_rgb8();
        let mask = image::load_from_memory(&mask_bytes).map_err(|e| {
            CompositeError::segmentation(format!(
                "cannot decode mask '{}': {}",
                self.mask_path.display(),
                e
            ))
        })?;
        let mask = Self::mask_channel(&mask);

        if subject.dimensions() != mask.dimensions() {
            return Err(CompositeError::dimension_mismatch(
                "mask file vs subject",
                subject.dimensions(),
                mask.dimensions(),
            ));
        }

        debug!(mask = %self.mask_path.display(), "Attaching mask file to subject");

        let matte = RgbaImage::from_fn(subject.width(), subject.height(), |x, y| {
            let [r, g, b] = subject.get_pixel(x, y).0;
            Rgba([r, g, b, mask.get_pixel(x, y).0[0]])
        });
        encode_png(&matte)
    }
}
