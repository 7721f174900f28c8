//! Shared fixtures for integration tests
//!
//! Synthetic subject and background photos plus segmentation backends that
//! need no matting model.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{codecs::png::PngEncoder, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};
use scene_composite::{CompositeConfig, CompositeError, Result, SegmentationBackend};
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Backend cutting an elliptical subject out of the center of the photo
#[derive(Debug, Clone, Default)]
pub struct EllipseBackend {
    calls: Arc<AtomicUsize>,
}

impl EllipseBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared call counter, usable after the backend is boxed
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl SegmentationBackend for EllipseBackend {
    fn name(&self) -> &str {
        "ellipse"
    }

    async fn remove_background(&self, image_bytes: &[u8]) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let photo = image::load_from_memory(image_bytes)?.to_rgb8();
        encode_png(&ellipse_cutout(&photo))
    }
}

/// Backend that always fails, counting its calls
#[derive(Debug, Clone, Default)]
pub struct FailingBackend {
    calls: Arc<AtomicUsize>,
}

impl FailingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl SegmentationBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    async fn remove_background(&self, _image_bytes: &[u8]) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CompositeError::segmentation("matting service unavailable"))
    }
}

pub fn ellipse_cutout(photo: &RgbImage) -> RgbaImage {
    let (width, height) = photo.dimensions();
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let (rx, ry) = (width as f32 * 0.4, height as f32 * 0.45);

    RgbaImage::from_fn(width, height, |x, y| {
        let [r, g, b] = photo.get_pixel(x, y).0;
        let nx = (x as f32 + 0.5 - cx) / rx;
        let ny = (y as f32 + 0.5 - cy) / ry;
        Rgba([r, g, b, if nx * nx + ny * ny <= 1.0 { 255 } else { 0 }])
    })
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(bytes)
}

/// Warm, bright subject photo
pub fn subject_photo(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            200 + (x % 40) as u8,
            150 + (y % 60) as u8,
            110 + ((x + y) % 50) as u8,
        ])
    })
}

/// Cool, darker background photo with a horizon
pub fn background_photo(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        if y < height / 2 {
            Rgb([70, 110, 160 + (x % 60) as u8])
        } else {
            Rgb([60 + (x % 30) as u8, 80, 50])
        }
    })
}

/// Write the subject and background photos into `dir`, returning their paths
pub fn write_inputs(dir: &Path, subject: (u32, u32), background: (u32, u32)) -> (PathBuf, PathBuf) {
    let subject_path = dir.join("person_original.png");
    let background_path = dir.join("background.png");
    subject_photo(subject.0, subject.1).save(&subject_path).unwrap();
    background_photo(background.0, background.1)
        .save(&background_path)
        .unwrap();
    (subject_path, background_path)
}

/// Small, fast, deterministic configuration writing PNG output into `output_dir`
pub fn quick_config(output_dir: &Path) -> CompositeConfig {
    CompositeConfig::builder()
        .placement(30, 20, 0.5)
        .shadow(15, 0.6)
        .noise(0.01, Some(7))
        .output_dir(output_dir)
        .final_name("final_composite.png")
        .build()
        .unwrap()
}

/// Number of files in a directory (zero if it does not exist)
pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map_or(0, |entries| entries.count())
}
