#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Scene Composite
//!
//! Places a segmented subject onto a new background photo with a cast
//! shadow, harmonized color tone and light film grain.
//!
//! The pipeline runs five stages over in-memory buffers:
//!
//! 1. **Segmentation**: an external background-removal capability
//!    ([`SegmentationBackend`]) turns the subject photo into a color buffer
//!    and an opacity mask.
//! 2. **Placement**: area-averaging resize and clipped placement onto a
//!    canvas the size of the background.
//! 3. **Shadow**: the placed mask is sheared along the light direction,
//!    Gaussian-blurred and scaled by opacity into a black RGBA layer.
//! 4. **Color harmonization**: masked foreground statistics are matched to
//!    the background in CIE Lab, either mean+variance per channel (default)
//!    or a lightness mean shift with gain.
//! 5. **Compositing**: background, shadow and foreground are blended "over"
//!    in that order, with optional seedable Gaussian grain.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_composite::{composite_files, CompositeConfig, MaskFileBackend};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = CompositeConfig::builder()
//!     .placement(450, 280, 0.85)
//!     .light_direction(0.7, 0.3)
//!     .shadow(91, 0.65)
//!     .noise(0.01, Some(42))
//!     .output_dir("output")
//!     .build()?;
//!
//! let backend = MaskFileBackend::new("input/person_mask.png");
//! let result = composite_files(
//!     "input/person_original.jpg",
//!     "input/background.jpg",
//!     config,
//!     Box::new(backend),
//! )
//! .await?;
//! println!("{:?}", result.dimensions());
//! # Ok(())
//! # }
//! ```
//!
//! ## In-memory compositing
//!
//! [`composite_segmented`] skips file I/O and segmentation entirely:
//!
//! ```rust
//! use image::{Rgb, RgbImage, Rgba, RgbaImage};
//! use scene_composite::{composite_segmented, CompositeConfig, SegmentedSubject};
//!
//! let subject = SegmentedSubject::from_rgba(&RgbaImage::from_pixel(40, 60, Rgba([200, 150, 120, 255])));
//! let background = RgbImage::from_pixel(160, 120, Rgb([40, 60, 90]));
//! let config = CompositeConfig::builder()
//!     .placement(50, 30, 1.0)
//!     .shadow(9, 0.5)
//!     .noise(0.0, None)
//!     .build()
//!     .unwrap();
//!
//! let result = composite_segmented(subject, &background, &config).unwrap();
//! assert_eq!(result.dimensions(), (160, 120));
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface, progress bar and tracing setup
//! - `tracing-json`: JSON log output for the CLI

pub mod compositor;
pub mod config;
pub mod error;
pub mod harmonize;
pub mod pipeline;
pub mod placement;
pub mod segmentation;
pub mod services;
pub mod shadow;
pub mod types;
pub mod utils;

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "cli")]
pub mod tracing_config;

use std::path::Path;

// Public API exports
pub use compositor::composite_layers;
pub use config::{
    CompositeConfig, CompositeConfigBuilder, GrainConfig, HarmonizationConfig,
    HarmonizationStrategy, InputConfig, LightDirection, OutputConfig, OutputFormat, Placement,
    ShadowParams,
};
pub use error::{CompositeError, CompositeWarning, Result};
pub use harmonize::{
    harmonizer_for, ChannelStats, ChannelTransfer, ColorHarmonizer, MeanShiftHarmonizer,
    MeanVarianceHarmonizer,
};
pub use pipeline::{CompositePipeline, SavedOutputs};
pub use placement::place_subject;
pub use segmentation::{
    segment_subject, AlphaMatteBackend, CommandBackend, MaskFileBackend, SegmentationBackend,
};
pub use services::{
    ConsoleProgressReporter, ImageIOService, NoOpProgressReporter, ProcessingStage,
    ProgressReporter, ProgressTracker, ProgressUpdate,
};
pub use shadow::create_shadow;
pub use types::{
    CompositeMetadata, CompositeReport, CompositeResult, Harmonized, PlacedLayers, SegmentedSubject,
    ShadowLayer, StageTimings,
};
pub use utils::NumericValidator;

#[cfg(feature = "cli")]
pub use tracing_config::{TracingConfig, TracingFormat};

/// Composite a subject photo onto a background and write the configured outputs
///
/// Validation happens before any file is read; both inputs are decoded
/// before the segmentation backend is called.
///
/// # Arguments
///
/// * `subject_path` - Subject photo handed to the segmentation backend
/// * `background_path` - Background photo defining the canvas size
/// * `config` - Placement, shadow, harmonization, grain and output settings
/// * `backend` - Background-removal capability
///
/// # Errors
/// - `InvalidParameter` for malformed configuration
/// - `MissingInputFile` / `UnreadableImage` for either input
/// - `Segmentation` if the backend fails
/// - `Io` / `Image` while writing outputs
pub async fn composite_files<P: AsRef<Path>, Q: AsRef<Path>>(
    subject_path: P,
    background_path: Q,
    config: CompositeConfig,
    backend: Box<dyn SegmentationBackend>,
) -> Result<CompositeResult> {
    let pipeline = CompositePipeline::new(config, backend)?;
    pipeline.run_and_save(subject_path, background_path).await
}

/// Composite an already segmented subject onto an in-memory background
///
/// Nothing is written to disk and no segmentation backend is involved.
///
/// # Errors
/// - `InvalidParameter` for malformed configuration
/// - `DimensionMismatch` if a stage receives buffers of different sizes
pub fn composite_segmented(
    subject: SegmentedSubject,
    background: &image::RgbImage,
    config: &CompositeConfig,
) -> Result<CompositeResult> {
    // Subject is already matted; the pre-cut backend is never called
    let pipeline = CompositePipeline::new(config.clone(), Box::new(AlphaMatteBackend::new()))?;
    pipeline.compose(subject, background)
}
