//! Cast-shadow synthesis
//!
//! The placed mask is skewed by a shear built from the light direction,
//! softened with a separable Gaussian blur and scaled by the shadow opacity.
//! Shadow color is always black; only the alpha channel varies.

use crate::{
    config::{LightDirection, ShadowParams},
    error::{CompositeError, Result},
    types::ShadowLayer,
};
use image::GrayImage;
use ndarray::Array2;
use tracing::{debug, instrument};

/// Convert a mask into a `(height, width)` float grid with values in [0, 255]
#[must_use]
pub fn mask_to_array(mask: &GrayImage) -> Array2<f32> {
    let (width, height) = mask.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        f32::from(mask.get_pixel(x as u32, y as u32).0[0])
    })
}

/// Skew a grid by the shear `x' = x + dx·y`, `y' = y + dy·x`
///
/// Output keeps the input shape. Each output pixel is sampled from the
/// inverse-mapped source position with bilinear interpolation; samples that
/// land outside the source read as zero.
///
/// # Errors
/// - `InvalidParameter` if the shear is not invertible
pub fn shear_warp(source: &Array2<f32>, dx: f64, dy: f64) -> Result<Array2<f32>> {
    let determinant = 1.0 - dx * dy;
    if determinant.abs() < crate::utils::validation::numeric::MIN_SHEAR_DETERMINANT {
        return Err(CompositeError::invalid_parameter(format!(
            "shear ({}, {}) is not invertible",
            dx, dy
        )));
    }

    let (height, width) = source.dim();
    let output = Array2::from_shape_fn((height, width), |(y, x)| {
        let (xo, yo) = (x as f64, y as f64);
        let sx = (xo - dx * yo) / determinant;
        let sy = (yo - dy * xo) / determinant;
        sample_bilinear(source, sx, sy)
    });

    Ok(output)
}

fn sample_bilinear(source: &Array2<f32>, x: f64, y: f64) -> f32 {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = (x - x0) as f32;
    let fy = (y - y0) as f32;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let at = |xi: i64, yi: i64| -> f32 {
        if xi < 0 || yi < 0 {
            return 0.0;
        }
        source.get((yi as usize, xi as usize)).copied().unwrap_or(0.0)
    };

    let top = at(x0, y0) * (1.0 - fx) + at(x0 + 1, y0) * fx;
    let bottom = at(x0, y0 + 1) * (1.0 - fx) + at(x0 + 1, y0 + 1) * fx;
    top * (1.0 - fy) + bottom * fy
}

/// Standard deviation used for a kernel size when none is given
///
/// Matches the common convention `0.3·((k − 1)/2 − 1) + 0.8`.
#[must_use]
pub fn sigma_for_kernel(kernel_size: u32) -> f64 {
    0.3 * ((f64::from(kernel_size) - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1-D Gaussian kernel of the given odd size
///
/// # Errors
/// - `InvalidParameter` for an even or zero size
pub fn gaussian_kernel(kernel_size: u32) -> Result<Vec<f32>> {
    crate::utils::NumericValidator::validate_odd_kernel(kernel_size, "blur kernel")?;

    let radius = (kernel_size / 2) as i64;
    let sigma = sigma_for_kernel(kernel_size);
    let denom = 2.0 * sigma * sigma;

    let weights: Vec<f64> = (-radius..=radius)
        .map(|i| {
            let x = i as f64;
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();

    Ok(weights.into_iter().map(|w| (w / sum) as f32).collect())
}

/// Mirror an out-of-range index back into `[0, len)` without repeating the edge
fn reflect_101(index: i64, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as i64 - 1);
    let mut i = index.rem_euclid(period);
    if i >= len as i64 {
        i = period - i;
    }
    i as usize
}

/// Separable Gaussian blur with mirrored borders
///
/// # Errors
/// - `InvalidParameter` for an even or zero kernel size
pub fn gaussian_blur(source: &Array2<f32>, kernel_size: u32) -> Result<Array2<f32>> {
    let kernel = gaussian_kernel(kernel_size)?;
    if kernel.len() == 1 {
        return Ok(source.clone());
    }

    let (height, width) = source.dim();
    if height == 0 || width == 0 {
        return Ok(source.clone());
    }
    let radius = (kernel.len() / 2) as i64;

    let horizontal = Array2::from_shape_fn((height, width), |(y, x)| {
        kernel
            .iter()
            .enumerate()
            .map(|(k, &w)| {
                let sx = reflect_101(x as i64 + k as i64 - radius, width);
                w * source[[y, sx]]
            })
            .sum::<f32>()
    });

    let vertical = Array2::from_shape_fn((height, width), |(y, x)| {
        kernel
            .iter()
            .enumerate()
            .map(|(k, &w)| {
                let sy = reflect_101(y as i64 + k as i64 - radius, height);
                w * horizontal[[sy, x]]
            })
            .sum::<f32>()
    });

    Ok(vertical)
}

/// Derive a shadow layer from the placed mask
///
/// # Errors
/// - `InvalidParameter` if opacity is outside [0, 1], the kernel is even or
///   zero, or the light direction is out of range or degenerate
#[instrument(skip_all, fields(
    size = %format!("{}x{}", mask.width(), mask.height()),
    dx = light.dx,
    dy = light.dy,
    kernel = params.blur_kernel,
    opacity = params.opacity
))]
pub fn create_shadow(
    mask: &GrayImage,
    light: LightDirection,
    params: &ShadowParams,
) -> Result<ShadowLayer> {
    params.validate()?;
    light.validate()?;

    let (width, height) = mask.dimensions();
    let source = mask_to_array(mask);
    let sheared = shear_warp(&source, light.dx, light.dy)?;
    let blurred = gaussian_blur(&sheared, params.blur_kernel)?;

    let opacity = params.opacity as f32;
    let alpha: Vec<f32> = blurred
        .iter()
        .map(|&v| (v / 255.0).clamp(0.0, 1.0) * opacity)
        .collect();

    let layer = ShadowLayer::from_alpha(width, height, &alpha)?;
    debug!(max_alpha = layer.max_alpha(), "Shadow layer synthesized");
    Ok(layer)
}
