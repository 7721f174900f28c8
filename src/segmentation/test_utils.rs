//! Test utilities and mock segmentation backends
//!
//! Mocks produce a synthetic elliptical matte so segmentation can be tested
//! without any matting model installed.

use super::{encode_png, SegmentationBackend};
use crate::error::{CompositeError, Result};
use async_trait::async_trait;
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MockBehavior {
    Matte,
    Fail,
    IoFailure,
    Garbage,
    Opaque,
}

/// Mock segmentation backend for testing
#[derive(Debug, Clone)]
pub struct MockSegmentationBackend {
    behavior: MockBehavior,
    /// Call history for verification in tests
    call_history: Arc<Mutex<Vec<String>>>,
}

impl MockSegmentationBackend {
    /// Backend returning an elliptical matte over the input
    #[must_use]
    pub fn new() -> Self {
        Self::with_behavior(MockBehavior::Matte)
    }

    /// Backend whose call fails with a segmentation error
    #[must_use]
    pub fn new_failing() -> Self {
        Self::with_behavior(MockBehavior::Fail)
    }

    /// Backend whose call fails with an I/O error
    #[must_use]
    pub fn new_io_failure() -> Self {
        Self::with_behavior(MockBehavior::IoFailure)
    }

    /// Backend returning bytes that are not an image
    #[must_use]
    pub fn new_garbage_output() -> Self {
        Self::with_behavior(MockBehavior::Garbage)
    }

    /// Backend returning an image without alpha
    #[must_use]
    pub fn new_opaque_output() -> Self {
        Self::with_behavior(MockBehavior::Opaque)
    }

    fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get the call history for verification in tests
    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }

    fn record_call(&self, method: &str) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(method.to_string());
        }
    }
}

impl Default for MockSegmentationBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Attach an elliptical matte centered on the image
#[must_use]
pub fn elliptical_matte(image: &RgbImage) -> RgbaImage {
    let (width, height) = image.dimensions();
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let (rx, ry) = ((width as f32 / 2.5).max(1.0), (height as f32 / 2.5).max(1.0));

    RgbaImage::from_fn(width, height, |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let nx = (x as f32 + 0.5 - cx) / rx;
        let ny = (y as f32 + 0.5 - cy) / ry;
        let alpha = if nx * nx + ny * ny <= 1.0 { 255 } else { 0 };
        Rgba([r, g, b, alpha])
    })
}

/// Encode a colorful test photo as JPEG bytes
#[must_use]
pub fn encode_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
    });
    let mut buffer = std::io::Cursor::new(Vec::new());
    image.write_to(&mut buffer, image::ImageFormat::Jpeg).unwrap();
    buffer.into_inner()
}

#[async_trait]
impl SegmentationBackend for MockSegmentationBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn remove_background(&self, image_bytes: &[u8]) -> Result<Vec<u8>> {
        self.record_call("remove_background");

        match self.behavior {
            MockBehavior::Fail => Err(CompositeError::segmentation("mock matting model crashed")),
            MockBehavior::IoFailure => Err(CompositeError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock pipe closed",
            ))),
            MockBehavior::Garbage => Ok(b"definitely not an image".to_vec()),
            MockBehavior::Opaque => {
                let image = image::load_from_memory(image_bytes)?.to_rgb8();
                let mut buffer = std::io::Cursor::new(Vec::new());
                image.write_to(&mut buffer, image::ImageFormat::Png)?;
                Ok(buffer.into_inner())
            },
            MockBehavior::Matte => {
                let image = image::load_from_memory(image_bytes)?.to_rgb8();
                encode_png(&elliptical_matte(&image))
            },
        }
    }
}
