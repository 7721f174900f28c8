//! Core buffer and result types for compositing operations

use crate::{
    config::{CompositeConfig, HarmonizationStrategy},
    error::{CompositeError, CompositeWarning, Result},
};
use chrono::{DateTime, Utc};
use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, Rgba32FImage, RgbaImage};
use serde::{Deserialize, Serialize};

/// Subject color and opacity after background removal
///
/// Color and mask are separate buffers on the same pixel grid. The color
/// buffer is not premultiplied: background pixels keep their color and are
/// hidden only by zero mask values.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedSubject {
    pub foreground: RgbImage,
    pub mask: GrayImage,
}

impl SegmentedSubject {
    /// Pair a color buffer with its mask
    ///
    /// # Errors
    /// - `DimensionMismatch` if the mask does not match the color buffer
    pub fn new(foreground: RgbImage, mask: GrayImage) -> Result<Self> {
        if foreground.dimensions() != mask.dimensions() {
            return Err(CompositeError::dimension_mismatch(
                "segmented subject mask",
                foreground.dimensions(),
                mask.dimensions(),
            ));
        }
        Ok(Self { foreground, mask })
    }

    /// Split an RGBA image into color and alpha
    #[must_use]
    pub fn from_rgba(image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let mut foreground = RgbImage::new(width, height);
        let mut mask = GrayImage::new(width, height);

        for (x, y, pixel) in image.enumerate_pixels() {
            let [r, g, b, a] = pixel.0;
            foreground.put_pixel(x, y, Rgb([r, g, b]));
            mask.put_pixel(x, y, Luma([a]));
        }

        Self { foreground, mask }
    }

    /// Recombine color and mask into a straight-alpha RGBA image
    #[must_use]
    pub fn to_rgba(&self) -> RgbaImage {
        rgba_with_mask(&self.foreground, &self.mask)
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.foreground.dimensions()
    }

    /// Fraction of pixels with non-zero opacity
    #[must_use]
    pub fn coverage(&self) -> f64 {
        mask_coverage(&self.mask)
    }
}

/// Canvas-sized foreground and mask produced by placement
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLayers {
    pub foreground: RgbImage,
    pub mask: GrayImage,
}

impl PlacedLayers {
    /// All-zero layers covering the canvas
    #[must_use]
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            foreground: RgbImage::new(width, height),
            mask: GrayImage::new(width, height),
        }
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.foreground.dimensions()
    }

    /// Whether nothing landed on the canvas
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mask.pixels().all(|p| p.0[0] == 0)
    }

    /// Fraction of canvas pixels covered by the subject
    #[must_use]
    pub fn coverage(&self) -> f64 {
        mask_coverage(&self.mask)
    }
}

/// Cast-shadow layer: black color channels with spatially varying alpha in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowLayer(Rgba32FImage);

impl ShadowLayer {
    /// Build a shadow layer from per-pixel alpha values in row-major order
    ///
    /// # Errors
    /// - `Internal` if the alpha slice does not cover `width * height` pixels
    pub fn from_alpha(width: u32, height: u32, alpha: &[f32]) -> Result<Self> {
        let expected = width as usize * height as usize;
        if alpha.len() != expected {
            return Err(CompositeError::internal(format!(
                "shadow alpha has {} samples, expected {}",
                alpha.len(),
                expected
            )));
        }

        let data: Vec<f32> = alpha
            .iter()
            .flat_map(|&a| [0.0, 0.0, 0.0, a.clamp(0.0, 1.0)])
            .collect();

        Rgba32FImage::from_raw(width, height, data)
            .map(Self)
            .ok_or_else(|| CompositeError::internal("failed to allocate shadow layer"))
    }

    /// Fully transparent shadow
    #[must_use]
    pub fn transparent(width: u32, height: u32) -> Self {
        Self(Rgba32FImage::new(width, height))
    }

    /// Alpha value at a pixel
    #[must_use]
    pub fn alpha(&self, x: u32, y: u32) -> f32 {
        self.0.get_pixel(x, y).0[3]
    }

    /// Color and alpha at a pixel
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Rgba<f32> {
        *self.0.get_pixel(x, y)
    }

    /// Largest alpha value in the layer
    #[must_use]
    pub fn max_alpha(&self) -> f32 {
        self.0.pixels().map(|p| p.0[3]).fold(0.0, f32::max)
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    #[must_use]
    pub fn as_image(&self) -> &Rgba32FImage {
        &self.0
    }

    /// 8-bit RGBA rendering (alpha scaled by 255)
    #[must_use]
    pub fn to_rgba8(&self) -> RgbaImage {
        let (width, height) = self.dimensions();
        RgbaImage::from_fn(width, height, |x, y| {
            let [r, g, b, a] = self.0.get_pixel(x, y).0;
            Rgba([
                unit_to_u8(r),
                unit_to_u8(g),
                unit_to_u8(b),
                unit_to_u8(a),
            ])
        })
    }
}

/// Harmonized foreground and the number of masked pixels it was fitted on
#[derive(Debug, Clone, PartialEq)]
pub struct Harmonized {
    pub image: RgbImage,
    pub masked_pixels: usize,
    /// Set when the stage passed its input through unchanged
    pub warning: Option<CompositeWarning>,
}

/// Per-stage wall-clock timings in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimings {
    pub image_load_ms: u64,
    pub segmentation_ms: u64,
    pub placement_ms: u64,
    pub shadow_ms: u64,
    pub harmonization_ms: u64,
    pub compositing_ms: u64,
    /// Output encoding (only when results were saved)
    pub image_encode_ms: Option<u64>,
    pub total_ms: u64,
}

impl StageTimings {
    /// Time spent in the compositing core (placement through blending)
    #[must_use]
    pub fn core_ms(&self) -> u64 {
        self.placement_ms + self.shadow_ms + self.harmonization_ms + self.compositing_ms
    }

    /// Single-line summary for logs
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "load {}ms, segment {}ms, place {}ms, shadow {}ms, harmonize {}ms, composite {}ms",
            self.image_load_ms,
            self.segmentation_ms,
            self.placement_ms,
            self.shadow_ms,
            self.harmonization_ms,
            self.compositing_ms
        );
        if let Some(encode) = self.image_encode_ms {
            summary.push_str(&format!(", encode {}ms", encode));
        }
        summary.push_str(&format!(" (total {}ms)", self.total_ms));
        summary
    }
}

/// Metadata about a compositing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeMetadata {
    pub created_at: DateTime<Utc>,
    pub canvas_dimensions: (u32, u32),
    pub subject_dimensions: (u32, u32),
    pub segmentation_backend: String,
    pub harmonization: HarmonizationStrategy,
    /// Fraction of canvas pixels covered by the placed subject
    pub subject_coverage: f64,
    pub grain_seed: Option<u64>,
    pub timings: StageTimings,
}

impl CompositeMetadata {
    #[must_use]
    pub fn new(segmentation_backend: String, harmonization: HarmonizationStrategy) -> Self {
        Self {
            created_at: Utc::now(),
            canvas_dimensions: (0, 0),
            subject_dimensions: (0, 0),
            segmentation_backend,
            harmonization,
            subject_coverage: 0.0,
            grain_seed: None,
            timings: StageTimings::default(),
        }
    }
}

/// Everything a compositing run produced
#[derive(Debug, Clone)]
pub struct CompositeResult {
    /// Final 8-bit composite, background-sized
    pub image: RgbImage,
    pub subject: SegmentedSubject,
    pub placed: PlacedLayers,
    pub shadow: ShadowLayer,
    pub harmonized: RgbImage,
    pub warnings: Vec<CompositeWarning>,
    pub metadata: CompositeMetadata,
}

impl CompositeResult {
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    #[must_use]
    pub fn timings(&self) -> &StageTimings {
        &self.metadata.timings
    }

    /// Harmonized foreground with the placed mask as its alpha channel
    #[must_use]
    pub fn harmonized_rgba(&self) -> RgbaImage {
        rgba_with_mask(&self.harmonized, &self.placed.mask)
    }

    /// Serializable report of this run
    #[must_use]
    pub fn report(&self, config: &CompositeConfig) -> CompositeReport {
        CompositeReport {
            metadata: self.metadata.clone(),
            warnings: self.warnings.clone(),
            config: config.clone(),
        }
    }
}

/// JSON report written next to the outputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeReport {
    pub metadata: CompositeMetadata,
    pub warnings: Vec<CompositeWarning>,
    pub config: CompositeConfig,
}

fn rgba_with_mask(color: &RgbImage, mask: &GrayImage) -> RgbaImage {
    let (width, height) = color.dimensions();
    RgbaImage::from_fn(width, height, |x, y| {
        let [r, g, b] = color.get_pixel(x, y).0;
        let a = mask.get_pixel_checked(x, y).map_or(0, |p| p.0[0]);
        Rgba([r, g, b, a])
    })
}

fn mask_coverage(mask: &GrayImage) -> f64 {
    let total = mask.width() as usize * mask.height() as usize;
    if total == 0 {
        return 0.0;
    }
    let covered = mask.pixels().filter(|p| p.0[0] > 0).count();
    covered as f64 / total as f64
}

fn unit_to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
