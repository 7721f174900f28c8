//! Subject scaling and placement onto the background canvas
//!
//! The segmented subject is resized with area averaging and copied into a
//! zero-filled canvas at the destination offset. Any part of the resized
//! subject that falls outside the canvas is cropped.

use crate::{
    config::Placement,
    error::{CompositeError, Result},
    types::{PlacedLayers, SegmentedSubject},
};
use image::{ImageBuffer, Pixel};
use std::ops::Range;
use tracing::{debug, instrument};

/// Source pixel contributions for one output pixel along an axis
type AxisWeights = Vec<Vec<(usize, f32)>>;

/// Resize an 8-bit image by area averaging
///
/// Each output pixel is the overlap-weighted mean of the source pixels its
/// footprint covers. An unchanged size returns an exact copy.
#[must_use]
pub fn resize_area<P>(
    image: &ImageBuffer<P, Vec<u8>>,
    width: u32,
    height: u32,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    resize_area_window(image, (width, height), 0..width as usize, 0..height as usize)
}

/// Area-resize to `size`, materializing only the given output window
///
/// The result is `columns.len()` x `rows.len()` and equals the same window
/// cut from a full [`resize_area`] output. Memory is bounded by the source
/// and the window, never by the full scaled size.
#[must_use]
pub fn resize_area_window<P>(
    image: &ImageBuffer<P, Vec<u8>>,
    size: (u32, u32),
    columns: Range<usize>,
    rows: Range<usize>,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let columns = columns.start..columns.end.min(size.0 as usize);
    let rows = rows.start..rows.end.min(size.1 as usize);
    let (dw, dh) = (columns.len(), rows.len());
    let (src_width, src_height) = image.dimensions();
    if dw == 0 || dh == 0 || src_width == 0 || src_height == 0 {
        return ImageBuffer::new(dw as u32, dh as u32);
    }

    let channels = usize::from(P::CHANNEL_COUNT);
    let src = image.as_raw();
    let (sw, sh) = (src_width as usize, src_height as usize);

    let x_weights = axis_weights(sw, size.0 as usize, columns);
    let y_weights = axis_weights(sh, size.1 as usize, rows);

    // Horizontal pass: (sh rows) x (window columns)
    let mut horizontal = vec![0.0f32; sh * dw * channels];
    for row in 0..sh {
        let src_row = &src[row * sw * channels..(row + 1) * sw * channels];
        let out_row = &mut horizontal[row * dw * channels..(row + 1) * dw * channels];
        for (x, weights) in x_weights.iter().enumerate() {
            for &(sx, w) in weights {
                for c in 0..channels {
                    out_row[x * channels + c] += w * f32::from(src_row[sx * channels + c]);
                }
            }
        }
    }

    // Vertical pass
    let mut data = vec![0u8; dh * dw * channels];
    let mut accumulator = vec![0.0f32; dw * channels];
    for (y, weights) in y_weights.iter().enumerate() {
        accumulator.iter_mut().for_each(|v| *v = 0.0);
        for &(sy, w) in weights {
            let src_row = &horizontal[sy * dw * channels..(sy + 1) * dw * channels];
            for (acc, &value) in accumulator.iter_mut().zip(src_row) {
                *acc += w * value;
            }
        }
        let out_row = &mut data[y * dw * channels..(y + 1) * dw * channels];
        for (out, &value) in out_row.iter_mut().zip(&accumulator) {
            *out = value.round().clamp(0.0, 255.0) as u8;
        }
    }

    // The buffer length matches width * height * channels by construction
    ImageBuffer::from_raw(dw as u32, dh as u32, data)
        .unwrap_or_else(|| ImageBuffer::new(dw as u32, dh as u32))
}

/// Overlap weights mapping the `window` of `dst` output cells onto `src` input cells
fn axis_weights(src: usize, dst: usize, window: Range<usize>) -> AxisWeights {
    let ratio = src as f64 / dst as f64;

    window
        .map(|i| {
            let start = i as f64 * ratio;
            let end = ((i + 1) as f64 * ratio).min(src as f64);
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src);

            let mut weights: Vec<(usize, f32)> = (first..last)
                .filter_map(|j| {
                    let overlap = end.min((j + 1) as f64) - start.max(j as f64);
                    (overlap > 1e-9).then_some((j, overlap as f32))
                })
                .collect();

            let total: f32 = weights.iter().map(|(_, w)| w).sum();
            if total > 0.0 {
                weights.iter_mut().for_each(|(_, w)| *w /= total);
            } else {
                weights = vec![(first.min(src - 1), 1.0)];
            }
            weights
        })
        .collect()
}

/// Scaled size of one dimension, never below one pixel
fn scaled_dimension(dimension: u32, scale: f64) -> Result<u32> {
    let scaled = (f64::from(dimension) * scale).round();
    if scaled > f64::from(u32::MAX) {
        return Err(CompositeError::invalid_parameter(format!(
            "scale factor {} makes dimension {} overflow",
            scale, dimension
        )));
    }
    Ok((scaled as u32).max(1))
}

/// Clip the span `[offset, offset + len)` against `[0, bound)`
///
/// Returns the canvas range and the matching start inside the source, or
/// `None` when nothing overlaps.
fn clip_span(offset: i64, len: u32, bound: u32) -> Option<(usize, usize, usize)> {
    let start = offset.max(0);
    let end = (offset + i64::from(len)).min(i64::from(bound));
    if end <= start {
        return None;
    }
    Some((start as usize, end as usize, (start - offset) as usize))
}

/// Scale the subject and place it on a canvas of the given size
///
/// # Errors
/// - `InvalidParameter` for a non-positive scale or an empty canvas
/// - `DimensionMismatch` if the subject mask does not match its color buffer
///
/// A subject placed entirely off-canvas yields all-zero layers, not an error.
#[instrument(skip_all, fields(canvas = %format!("{}x{}", canvas.0, canvas.1), x = placement.x, y = placement.y, scale = placement.scale))]
pub fn place_subject(
    subject: &SegmentedSubject,
    canvas: (u32, u32),
    placement: &Placement,
) -> Result<PlacedLayers> {
    placement.validate()?;

    let (canvas_width, canvas_height) = canvas;
    if canvas_width == 0 || canvas_height == 0 {
        return Err(CompositeError::invalid_parameter(format!(
            "canvas must be non-empty, got {}x{}",
            canvas_width, canvas_height
        )));
    }
    if subject.foreground.dimensions() != subject.mask.dimensions() {
        return Err(CompositeError::dimension_mismatch(
            "subject mask vs foreground",
            subject.foreground.dimensions(),
            subject.mask.dimensions(),
        ));
    }

    let (src_width, src_height) = subject.dimensions();
    let new_width = scaled_dimension(src_width, placement.scale)?;
    let new_height = scaled_dimension(src_height, placement.scale)?;

    let mut layers = PlacedLayers::empty(canvas_width, canvas_height);

    let columns = clip_span(i64::from(placement.x), new_width, canvas_width);
    let rows = clip_span(i64::from(placement.y), new_height, canvas_height);
    let (Some((x1, x2, sx)), Some((y1, y2, sy))) = (columns, rows) else {
        debug!(
            resized = %format!("{}x{}", new_width, new_height),
            "Subject lies entirely outside the canvas"
        );
        return Ok(layers);
    };

    // Only the visible window of the scaled subject is resized
    let (copy_width, copy_height) = (x2 - x1, y2 - y1);
    let visible_columns = sx..sx + copy_width;
    let visible_rows = sy..sy + copy_height;
    let scaled = (new_width, new_height);
    let resized_fg =
        resize_area_window(&subject.foreground, scaled, visible_columns.clone(), visible_rows.clone());
    let resized_mask = resize_area_window(&subject.mask, scaled, visible_columns, visible_rows);

    let canvas_w = canvas_width as usize;

    copy_rows(
        resized_fg.as_raw(),
        &mut layers.foreground,
        3,
        (copy_width, canvas_w),
        (x1, y1),
        (copy_width, copy_height),
    );
    copy_rows(
        resized_mask.as_raw(),
        &mut layers.mask,
        1,
        (copy_width, canvas_w),
        (x1, y1),
        (copy_width, copy_height),
    );

    debug!(
        resized = %format!("{}x{}", new_width, new_height),
        region = %format!("[{}..{}) x [{}..{})", x1, x2, y1, y2),
        "Placed subject on canvas"
    );

    Ok(layers)
}

/// Copy a window buffer into a rectangle of the canvas, row by row
fn copy_rows(
    src: &[u8],
    dst: &mut [u8],
    channels: usize,
    (src_width, dst_width): (usize, usize),
    (dst_x, dst_y): (usize, usize),
    (width, height): (usize, usize),
) {
    let span = width * channels;
    for row in 0..height {
        let src_start = row * src_width * channels;
        let dst_start = ((dst_y + row) * dst_width + dst_x) * channels;
        dst[dst_start..dst_start + span].copy_from_slice(&src[src_start..src_start + span]);
    }
}
