//! Layer compositing: background, then shadow, then foreground
//!
//! Both blends use straight-alpha "over" in normalized float space. Optional
//! Gaussian grain is added after blending to break up flat regions.

use crate::{
    config::GrainConfig,
    error::{CompositeError, Result},
    types::ShadowLayer,
};
use image::{GrayImage, RgbImage};
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::{debug, instrument};

/// Seeded source of zero-mean grain samples
struct Grain {
    rng: StdRng,
    normal: Normal<f32>,
}

impl Grain {
    fn from_config(config: &GrainConfig) -> Result<Option<Self>> {
        if !config.is_enabled() {
            return Ok(None);
        }

        let normal = Normal::new(0.0, config.std_dev as f32).map_err(|e| {
            CompositeError::config_value_error("noise standard deviation", format!("{} ({})", config.std_dev, e), ">= 0")
        })?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Some(Self { rng, normal }))
    }

    fn sample(&mut self) -> f32 {
        self.normal.sample(&mut self.rng)
    }
}

fn ensure_same_size(context: &str, expected: (u32, u32), actual: (u32, u32)) -> Result<()> {
    if expected != actual {
        return Err(CompositeError::dimension_mismatch(context, expected, actual));
    }
    Ok(())
}

/// Blend shadow and foreground over the background
///
/// Per channel, with every value normalized to [0, 1]:
/// `base = bg·(1 − a_s) + shadow·a_s`, then `out = base·(1 − m) + fg·m`,
/// then optional grain, clipped and rounded back to 8 bits. Grain samples are
/// drawn in row-major, channel-minor order.
///
/// # Errors
/// - `DimensionMismatch` if any layer differs in size from the background
/// - `InvalidParameter` for a negative or non-finite grain deviation
#[instrument(skip_all, fields(
    size = %format!("{}x{}", background.width(), background.height()),
    noise = grain.std_dev,
    seeded = grain.seed.is_some()
))]
pub fn composite_layers(
    background: &RgbImage,
    shadow: &ShadowLayer,
    foreground: &RgbImage,
    mask: &GrayImage,
    grain: &GrainConfig,
) -> Result<RgbImage> {
    let canvas = background.dimensions();
    ensure_same_size("shadow layer vs background", canvas, shadow.dimensions())?;
    ensure_same_size("foreground vs background", canvas, foreground.dimensions())?;
    ensure_same_size("foreground mask vs background", canvas, mask.dimensions())?;

    grain.validate()?;
    let mut noise = Grain::from_config(grain)?;

    let mut output = RgbImage::new(canvas.0, canvas.1);
    for (x, y, out) in output.enumerate_pixels_mut() {
        let bg = background.get_pixel(x, y).0;
        let fg = foreground.get_pixel(x, y).0;
        let shadow_pixel = shadow.pixel(x, y).0;
        let shadow_alpha = shadow_pixel[3];
        let coverage = f32::from(mask.get_pixel(x, y).0[0]) / 255.0;

        for c in 0..3 {
            let base = f32::from(bg[c]) / 255.0;
            let shaded = base * (1.0 - shadow_alpha) + shadow_pixel[c] * shadow_alpha;
            let mut value = shaded * (1.0 - coverage) + (f32::from(fg[c]) / 255.0) * coverage;
            if let Some(grain) = noise.as_mut() {
                value += grain.sample();
            }
            out.0[c] = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
    }

    debug!("Layers composited");
    Ok(output)
}
