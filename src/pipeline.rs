//! Compositing pipeline orchestrator
//!
//! `CompositePipeline` runs the stages in order: input loading,
//! segmentation, placement, shadow synthesis, color harmonization and layer
//! compositing. Any stage error aborts the run; outputs are written only
//! after the whole composite has succeeded.

use crate::{
    compositor::composite_layers,
    config::{CompositeConfig, OutputFormat},
    error::Result,
    harmonize::{harmonizer_for, ColorHarmonizer},
    placement::place_subject,
    segmentation::{segment_subject, SegmentationBackend},
    services::{ImageIOService, NoOpProgressReporter, ProcessingStage, ProgressReporter, ProgressTracker},
    shadow::create_shadow,
    types::{CompositeMetadata, CompositeResult, SegmentedSubject, StageTimings},
};
use image::{DynamicImage, RgbImage};
use instant::Instant;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument, span, warn, Instrument, Level};

/// File name of the segmented subject (RGBA)
pub const SUBJECT_FOREGROUND_FILE: &str = "subject_foreground.png";
/// File name of the shadow layer (RGBA)
pub const SHADOW_LAYER_FILE: &str = "shadow_layer.png";
/// File name of the placed, harmonized foreground (RGBA)
pub const HARMONIZED_FOREGROUND_FILE: &str = "harmonized_foreground.png";
/// File name of the JSON run report
pub const REPORT_FILE: &str = "composite_report.json";

/// Paths written by [`CompositePipeline::save_outputs`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedOutputs {
    pub final_image: PathBuf,
    pub intermediates: Vec<PathBuf>,
    pub report: Option<PathBuf>,
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Orchestrates one subject-over-background composite
pub struct CompositePipeline {
    config: CompositeConfig,
    backend: Box<dyn SegmentationBackend>,
    harmonizer: Box<dyn ColorHarmonizer>,
    progress_reporter: Box<dyn ProgressReporter>,
}

impl CompositePipeline {
    /// Create a pipeline, validating the configuration up front
    ///
    /// # Errors
    /// - `InvalidParameter` for any configuration value outside its domain
    pub fn new(config: CompositeConfig, backend: Box<dyn SegmentationBackend>) -> Result<Self> {
        config.validate()?;
        let harmonizer = harmonizer_for(&config.harmonization);

        debug!(
            backend = backend.name(),
            harmonizer = harmonizer.name(),
            "Composite pipeline created"
        );

        Ok(Self {
            config,
            backend,
            harmonizer,
            progress_reporter: Box::new(NoOpProgressReporter),
        })
    }

    /// Attach a progress reporter
    #[must_use]
    pub fn with_progress_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.progress_reporter = reporter;
        self
    }

    #[must_use]
    pub fn config(&self) -> &CompositeConfig {
        &self.config
    }

    #[must_use]
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Composite the subject and background at the given paths
    ///
    /// Nothing is written to disk.
    ///
    /// # Errors
    /// - `MissingInputFile` / `UnreadableImage` for either input, checked
    ///   before segmentation
    /// - `Segmentation` if the backend fails
    /// - Any stage error from placement, shadow, harmonization or compositing
    pub async fn run<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        subject_path: P,
        background_path: Q,
    ) -> Result<CompositeResult> {
        self.execute(subject_path.as_ref(), background_path.as_ref(), false)
            .await
    }

    /// Composite and write every configured output
    ///
    /// # Errors
    /// - Everything [`run`](Self::run) reports
    /// - `Io` / `Image` / `Serialization` errors while writing outputs
    pub async fn run_and_save<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        subject_path: P,
        background_path: Q,
    ) -> Result<CompositeResult> {
        self.execute(subject_path.as_ref(), background_path.as_ref(), true)
            .await
    }

    /// Composite the inputs named in the configuration and save the outputs
    pub async fn run_configured(&self) -> Result<CompositeResult> {
        let subject = self.config.input.subject_path();
        let background = self.config.input.background_path();
        self.run_and_save(subject, background).await
    }

    #[instrument(
        skip(self, subject_path, background_path),
        fields(
            backend = %self.backend.name(),
            harmonizer = %self.harmonizer.name(),
            subject = %subject_path.display(),
            background = %background_path.display()
        )
    )]
    async fn execute(
        &self,
        subject_path: &Path,
        background_path: &Path,
        save: bool,
    ) -> Result<CompositeResult> {
        let total_start = Instant::now();
        let mut tracker = ProgressTracker::new(self.progress_reporter.as_ref());

        info!("🎯 Starting composite");

        let outcome = self
            .execute_stages(subject_path, background_path, save, &mut tracker)
            .await;

        match outcome {
            Ok(mut result) => {
                result.metadata.timings.total_ms = elapsed_ms(total_start);
                if save && self.config.output.write_report {
                    // Report carries the final total
                    self.write_report(&result)?;
                }
                tracker.report_completion(&result.metadata.timings);
                info!(
                    timings = %result.metadata.timings.summary(),
                    core_ms = result.metadata.timings.core_ms(),
                    warnings = result.warnings.len(),
                    "✅ Composite finished"
                );
                Ok(result)
            },
            Err(e) => {
                tracker.report_error(&e.to_string());
                error!(error = %e, stage = ?tracker.current_stage(), "Composite aborted");
                Err(e)
            },
        }
    }

    async fn execute_stages(
        &self,
        subject_path: &Path,
        background_path: &Path,
        save: bool,
        tracker: &mut ProgressTracker<'_>,
    ) -> Result<CompositeResult> {
        tracker.report_stage(ProcessingStage::InputLoading);
        let load_start = Instant::now();
        let (subject_bytes, background) = {
            let _span = span!(Level::DEBUG, "input_loading").entered();
            let subject_bytes = ImageIOService::read_bytes(subject_path)?;
            let background = ImageIOService::read_bytes(background_path)?;
            // Both inputs must decode before the segmentation call
            ImageIOService::load_from_bytes(&subject_bytes, subject_path)?;
            let background = ImageIOService::load_from_bytes(&background, background_path)?;
            (subject_bytes, background.to_rgb8())
        };
        let image_load_ms = elapsed_ms(load_start);

        tracker.report_stage(ProcessingStage::Segmentation);
        let segmentation_start = Instant::now();
        let subject = segment_subject(self.backend.as_ref(), &subject_bytes)
            .instrument(span!(Level::INFO, "segmentation", backend = %self.backend.name()))
            .await?;
        let segmentation_ms = elapsed_ms(segmentation_start);

        let mut result = self.compose_tracked(subject, &background, tracker)?;
        result.metadata.timings.image_load_ms = image_load_ms;
        result.metadata.timings.segmentation_ms = segmentation_ms;

        if save {
            tracker.report_stage(ProcessingStage::FileSaving);
            self.save_outputs(&mut result)?;
        }

        Ok(result)
    }

    /// Run placement, shadow, harmonization and compositing on in-memory buffers
    ///
    /// # Errors
    /// - `InvalidParameter` / `DimensionMismatch` raised by a stage
    pub fn compose(&self, subject: SegmentedSubject, background: &RgbImage) -> Result<CompositeResult> {
        let mut tracker = ProgressTracker::new(self.progress_reporter.as_ref());
        self.compose_tracked(subject, background, &mut tracker)
    }

    fn compose_tracked(
        &self,
        subject: SegmentedSubject,
        background: &RgbImage,
        tracker: &mut ProgressTracker<'_>,
    ) -> Result<CompositeResult> {
        let canvas = background.dimensions();
        let mut timings = StageTimings::default();
        let mut warnings = Vec::new();

        tracker.report_stage(ProcessingStage::Placement);
        let stage_start = Instant::now();
        let placed = {
            let _span = span!(Level::DEBUG, "placement").entered();
            place_subject(&subject, canvas, &self.config.placement)?
        };
        timings.placement_ms = elapsed_ms(stage_start);

        tracker.report_stage(ProcessingStage::ShadowSynthesis);
        let stage_start = Instant::now();
        let shadow = {
            let _span = span!(Level::DEBUG, "shadow_synthesis").entered();
            create_shadow(&placed.mask, self.config.light_direction, &self.config.shadow)?
        };
        timings.shadow_ms = elapsed_ms(stage_start);

        tracker.report_stage(ProcessingStage::ColorHarmonization);
        let stage_start = Instant::now();
        let harmonized = {
            let _span = span!(Level::DEBUG, "color_harmonization", strategy = self.harmonizer.name())
                .entered();
            self.harmonizer
                .harmonize(&placed.foreground, background, &placed.mask)?
        };
        timings.harmonization_ms = elapsed_ms(stage_start);
        if let Some(warning) = harmonized.warning.clone() {
            warn!(%warning, "Stage passed its input through");
            warnings.push(warning);
        }

        tracker.report_stage(ProcessingStage::Compositing);
        let stage_start = Instant::now();
        let image = {
            let _span = span!(Level::DEBUG, "compositing").entered();
            composite_layers(
                background,
                &shadow,
                &harmonized.image,
                &placed.mask,
                &self.config.grain,
            )?
        };
        timings.compositing_ms = elapsed_ms(stage_start);

        let mut metadata = CompositeMetadata::new(
            self.backend.name().to_string(),
            self.config.harmonization.strategy,
        );
        metadata.canvas_dimensions = canvas;
        metadata.subject_dimensions = subject.dimensions();
        metadata.subject_coverage = placed.coverage();
        metadata.grain_seed = self.config.grain.seed;
        metadata.timings = timings;

        Ok(CompositeResult {
            image,
            subject,
            placed,
            shadow,
            harmonized: harmonized.image,
            warnings,
            metadata,
        })
    }

    /// Write the final composite and, if configured, intermediates and report
    ///
    /// Records the encoding time in the result's timings.
    ///
    /// # Errors
    /// - `Io` if the output directory or a file cannot be written
    /// - `Image` if encoding fails
    /// - `InvalidParameter` for an unsupported output extension
    pub fn save_outputs(&self, result: &mut CompositeResult) -> Result<SavedOutputs> {
        let output = &self.config.output;
        let encode_start = Instant::now();
        ImageIOService::ensure_dir(&output.dir)?;

        let mut saved = SavedOutputs::default();

        if output.save_intermediates {
            let layers: [(&str, DynamicImage); 3] = [
                (SUBJECT_FOREGROUND_FILE, DynamicImage::ImageRgba8(result.subject.to_rgba())),
                (SHADOW_LAYER_FILE, DynamicImage::ImageRgba8(result.shadow.to_rgba8())),
                (HARMONIZED_FOREGROUND_FILE, DynamicImage::ImageRgba8(result.harmonized_rgba())),
            ];
            for (name, image) in layers {
                let path = output.dir.join(name);
                ImageIOService::save_image(&image, &path, OutputFormat::Png, output.jpeg_quality)?;
                saved.intermediates.push(path);
            }
        }

        let final_path = output.final_path();
        ImageIOService::save_image(
            &DynamicImage::ImageRgb8(result.image.clone()),
            &final_path,
            output.format()?,
            output.jpeg_quality,
        )?;
        saved.final_image = final_path;

        result.metadata.timings.image_encode_ms = Some(elapsed_ms(encode_start));

        if output.write_report {
            saved.report = Some(self.write_report(result)?);
        }

        info!(
            final_image = %saved.final_image.display(),
            intermediates = saved.intermediates.len(),
            "💾 Outputs written"
        );
        Ok(saved)
    }

    fn write_report(&self, result: &CompositeResult) -> Result<PathBuf> {
        let path = self.config.output.dir.join(REPORT_FILE);
        ImageIOService::write_json(&result.report(&self.config), &path)?;
        Ok(path)
    }
}

impl std::fmt::Debug for CompositePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositePipeline")
            .field("config", &self.config)
            .field("backend", &self.backend.name())
            .field("harmonizer", &self.harmonizer.name())
            .finish_non_exhaustive()
    }
}
