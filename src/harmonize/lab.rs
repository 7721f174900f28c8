//! CIE Lab conversion and channel statistics

use image::{GrayImage, RgbImage};
use ndarray::{Array2, Axis};
use palette::{FromColor, IntoColor, Lab, LinSrgb, Srgb};

/// Valid lightness range
pub const L_RANGE: (f32, f32) = (0.0, 100.0);
/// Range the chroma axes are clipped to
pub const AB_RANGE: (f32, f32) = (-128.0, 127.0);

/// Convert an 8-bit sRGB triple to Lab (D65)
#[must_use]
pub fn rgb_to_lab(rgb: [u8; 3]) -> [f32; 3] {
    let srgb = Srgb::new(
        f32::from(rgb[0]) / 255.0,
        f32::from(rgb[1]) / 255.0,
        f32::from(rgb[2]) / 255.0,
    );
    let linear: LinSrgb<f32> = srgb.into_linear();
    let lab: Lab = Lab::from_color(linear);
    [lab.l, lab.a, lab.b]
}

/// Convert a Lab triple back to 8-bit sRGB, clamping out-of-gamut values
#[must_use]
pub fn lab_to_rgb(lab: [f32; 3]) -> [u8; 3] {
    let lab: Lab = Lab::new(lab[0], lab[1], lab[2]);
    let linear: LinSrgb<f32> = lab.into_color();
    let srgb: Srgb<f32> = Srgb::from_linear(linear);
    [
        unit_to_u8(srgb.red),
        unit_to_u8(srgb.green),
        unit_to_u8(srgb.blue),
    ]
}

/// Clip a Lab triple to the representable range
#[must_use]
pub fn clip_lab(lab: [f32; 3]) -> [f32; 3] {
    [
        lab[0].clamp(L_RANGE.0, L_RANGE.1),
        lab[1].clamp(AB_RANGE.0, AB_RANGE.1),
        lab[2].clamp(AB_RANGE.0, AB_RANGE.1),
    ]
}

fn unit_to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Lab samples of an image as an `(n, 3)` array
///
/// With a mask only pixels whose mask value is non-zero are included, in
/// row-major order.
#[must_use]
pub fn lab_samples(image: &RgbImage, mask: Option<&GrayImage>) -> Array2<f64> {
    let values: Vec<f64> = image
        .enumerate_pixels()
        .filter(|(x, y, _)| {
            mask.map_or(true, |m| m.get_pixel_checked(*x, *y).is_some_and(|p| p.0[0] > 0))
        })
        .flat_map(|(_, _, pixel)| rgb_to_lab(pixel.0).map(f64::from))
        .collect();

    let rows = values.len() / 3;
    Array2::from_shape_vec((rows, 3), values).unwrap_or_else(|_| Array2::zeros((0, 3)))
}

/// Per-channel mean and population standard deviation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStats {
    pub mean: [f64; 3],
    pub std: [f64; 3],
    pub count: usize,
}

impl ChannelStats {
    /// Statistics over an `(n, 3)` sample array; `None` when there are no samples
    #[must_use]
    pub fn from_samples(samples: &Array2<f64>) -> Option<Self> {
        let count = samples.nrows();
        if count == 0 || samples.ncols() != 3 {
            return None;
        }

        let mean = samples.mean_axis(Axis(0))?;
        let std = samples.std_axis(Axis(0), 0.0);

        Some(Self {
            mean: [mean[0], mean[1], mean[2]],
            std: [std[0], std[1], std[2]],
            count,
        })
    }

    /// Statistics of an image, optionally restricted to masked pixels
    #[must_use]
    pub fn of_image(image: &RgbImage, mask: Option<&GrayImage>) -> Option<Self> {
        Self::from_samples(&lab_samples(image, mask))
    }
}
