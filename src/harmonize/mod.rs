//! Color harmonization of the placed foreground against the background
//!
//! Harmonizers fit an affine per-channel transfer in Lab space from the
//! masked foreground statistics to the global background statistics, then
//! apply it only under the mask. Unmasked pixels are copied unchanged.

pub mod lab;
pub mod mean_shift;
pub mod mean_variance;

pub use lab::ChannelStats;
pub use mean_shift::MeanShiftHarmonizer;
pub use mean_variance::MeanVarianceHarmonizer;

use crate::{
    config::{HarmonizationConfig, HarmonizationStrategy},
    error::{CompositeError, CompositeWarning, Result},
    types::Harmonized,
};
use image::{GrayImage, Rgb, RgbImage};
use tracing::{debug, warn};

/// Stage name used in warnings
pub const STAGE_NAME: &str = "color harmonization";

/// Per-channel affine map `value * scale + offset` in Lab space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelTransfer {
    pub scale: [f64; 3],
    pub offset: [f64; 3],
}

impl ChannelTransfer {
    /// Transfer that leaves every channel unchanged
    #[must_use]
    pub fn identity() -> Self {
        Self {
            scale: [1.0; 3],
            offset: [0.0; 3],
        }
    }

    /// Apply to one Lab triple and clip to the valid range
    #[must_use]
    pub fn apply(&self, lab: [f32; 3]) -> [f32; 3] {
        let mut out = [0.0f32; 3];
        for c in 0..3 {
            out[c] = (f64::from(lab[c]) * self.scale[c] + self.offset[c]) as f32;
        }
        lab::clip_lab(out)
    }
}

/// Statistic-matching policy for color harmonization
pub trait ColorHarmonizer: Send + Sync {
    /// Short strategy name for logs and reports
    fn name(&self) -> &'static str;

    /// Derive the Lab transfer from masked foreground and background statistics
    fn plan(&self, source: &ChannelStats, target: &ChannelStats) -> ChannelTransfer;

    /// Harmonize `foreground` toward `background` under `mask`
    ///
    /// # Errors
    /// - `DimensionMismatch` if the mask does not match the foreground
    /// - `InvalidParameter` if the background is empty
    ///
    /// An all-zero mask returns the foreground unchanged with an
    /// [`CompositeWarning::EmptyMask`] attached.
    fn harmonize(
        &self,
        foreground: &RgbImage,
        background: &RgbImage,
        mask: &GrayImage,
    ) -> Result<Harmonized> {
        if foreground.dimensions() != mask.dimensions() {
            return Err(CompositeError::dimension_mismatch(
                "harmonization mask vs foreground",
                foreground.dimensions(),
                mask.dimensions(),
            ));
        }

        let Some(source) = ChannelStats::of_image(foreground, Some(mask)) else {
            let warning = CompositeWarning::empty_mask(STAGE_NAME);
            warn!(strategy = self.name(), "{}", warning);
            return Ok(Harmonized {
                image: foreground.clone(),
                masked_pixels: 0,
                warning: Some(warning),
            });
        };

        let target = ChannelStats::of_image(background, None).ok_or_else(|| {
            CompositeError::invalid_parameter("background image must not be empty")
        })?;

        let transfer = self.plan(&source, &target);
        debug!(
            strategy = self.name(),
            masked_pixels = source.count,
            source_l = source.mean[0],
            target_l = target.mean[0],
            scale = ?transfer.scale,
            offset = ?transfer.offset,
            "Harmonization transfer planned"
        );

        Ok(Harmonized {
            image: apply_under_mask(foreground, mask, &transfer),
            masked_pixels: source.count,
            warning: None,
        })
    }
}

/// Apply a transfer to masked pixels; other pixels are copied verbatim
#[must_use]
pub fn apply_under_mask(
    foreground: &RgbImage,
    mask: &GrayImage,
    transfer: &ChannelTransfer,
) -> RgbImage {
    let mut output = foreground.clone();
    for (x, y, pixel) in output.enumerate_pixels_mut() {
        if mask.get_pixel(x, y).0[0] == 0 {
            continue;
        }
        let shifted = transfer.apply(lab::rgb_to_lab(pixel.0));
        *pixel = Rgb(lab::lab_to_rgb(shifted));
    }
    output
}

/// Build the harmonizer selected by the configuration
#[must_use]
pub fn harmonizer_for(config: &HarmonizationConfig) -> Box<dyn ColorHarmonizer> {
    match config.strategy {
        HarmonizationStrategy::MeanVariance => Box::new(MeanVarianceHarmonizer),
        HarmonizationStrategy::MeanShift => Box::new(MeanShiftHarmonizer::new(config.mean_shift_gain)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn scene() -> (RgbImage, RgbImage, GrayImage) {
        let foreground = RgbImage::from_fn(12, 10, |x, y| Rgb([(20 * x) as u8, (25 * y) as u8, 180]));
        let background = RgbImage::from_fn(12, 10, |x, _| Rgb([40, (10 * x) as u8, 60]));
        let mask = GrayImage::from_fn(12, 10, |x, y| Luma([if (3..9).contains(&x) && y > 2 { 255 } else { 0 }]));
        (foreground, background, mask)
    }

    fn strategies() -> Vec<Box<dyn ColorHarmonizer>> {
        vec![
            harmonizer_for(&HarmonizationConfig::default()),
            harmonizer_for(&HarmonizationConfig {
                strategy: HarmonizationStrategy::MeanShift,
                mean_shift_gain: 1.7,
            }),
        ]
    }

    #[test]
    fn test_unmasked_pixels_pass_through() {
        let (foreground, background, mask) = scene();
        for harmonizer in strategies() {
            let result = harmonizer.harmonize(&foreground, &background, &mask).unwrap();
            assert_eq!(result.image.dimensions(), foreground.dimensions());
            for (x, y, m) in mask.enumerate_pixels() {
                if m.0[0] == 0 {
                    assert_eq!(result.image.get_pixel(x, y), foreground.get_pixel(x, y), "{}", harmonizer.name());
                }
            }
            assert_eq!(result.masked_pixels, 6 * 7);
            assert!(result.warning.is_none());
        }
    }

    #[test]
    fn test_empty_mask_returns_input_with_warning() {
        let (foreground, background, _) = scene();
        let empty = GrayImage::new(12, 10);
        for harmonizer in strategies() {
            let result = harmonizer.harmonize(&foreground, &background, &empty).unwrap();
            assert_eq!(result.image, foreground);
            assert_eq!(result.masked_pixels, 0);
            assert_eq!(result.warning, Some(CompositeWarning::empty_mask(STAGE_NAME)));
        }
    }

    #[test]
    fn test_mask_dimension_mismatch() {
        let (foreground, background, _) = scene();
        let mask = GrayImage::new(11, 10);
        for harmonizer in strategies() {
            let err = harmonizer.harmonize(&foreground, &background, &mask).unwrap_err();
            assert!(matches!(err, CompositeError::DimensionMismatch { .. }));
        }
    }

    #[test]
    fn test_background_size_may_differ() {
        let (foreground, _, mask) = scene();
        let background = RgbImage::from_pixel(3, 3, Rgb([90, 90, 90]));
        let result = MeanVarianceHarmonizer.harmonize(&foreground, &background, &mask).unwrap();
        assert_eq!(result.image.dimensions(), (12, 10));

        let empty_background = RgbImage::new(0, 0);
        let err = MeanVarianceHarmonizer
            .harmonize(&foreground, &empty_background, &mask)
            .unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn test_identity_transfer_is_near_lossless() {
        let (foreground, _, mask) = scene();
        let output = apply_under_mask(&foreground, &mask, &ChannelTransfer::identity());
        for (a, b) in output.pixels().zip(foreground.pixels()) {
            for c in 0..3 {
                assert!((i16::from(a.0[c]) - i16::from(b.0[c])).abs() <= 1);
            }
        }
    }

    #[test]
    fn test_harmonizer_selection() {
        let config = HarmonizationConfig::default();
        assert_eq!(harmonizer_for(&config).name(), "mean-variance");
        let config = HarmonizationConfig {
            strategy: HarmonizationStrategy::MeanShift,
            mean_shift_gain: 1.2,
        };
        assert_eq!(harmonizer_for(&config).name(), "mean-shift");
    }
}
