//! Progress reporting service
//!
//! Separates progress reporting from the compositing stages so each frontend
//! can render progress its own way.

use crate::types::StageTimings;
use instant::Instant;

/// Stages of one compositing run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Reading and decoding the subject and background
    InputLoading,
    /// Calling the segmentation backend
    Segmentation,
    /// Scaling and placing the subject on the canvas
    Placement,
    /// Synthesizing the cast shadow
    ShadowSynthesis,
    /// Matching foreground color statistics to the background
    ColorHarmonization,
    /// Blending background, shadow and foreground
    Compositing,
    /// Writing outputs to disk
    FileSaving,
    /// Run completed
    Completed,
}

impl ProcessingStage {
    /// Get a human-readable description of the processing stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::InputLoading => "Loading input images",
            ProcessingStage::Segmentation => "Removing subject background",
            ProcessingStage::Placement => "Placing subject on background",
            ProcessingStage::ShadowSynthesis => "Synthesizing cast shadow",
            ProcessingStage::ColorHarmonization => "Harmonizing subject colors",
            ProcessingStage::Compositing => "Compositing layers",
            ProcessingStage::FileSaving => "Saving outputs",
            ProcessingStage::Completed => "Compositing completed",
        }
    }

    /// Get the typical progress percentage for this stage
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        match self {
            ProcessingStage::InputLoading => 5,
            ProcessingStage::Segmentation => 15,
            ProcessingStage::Placement => 50,
            ProcessingStage::ShadowSynthesis => 60,
            ProcessingStage::ColorHarmonization => 75,
            ProcessingStage::Compositing => 88,
            ProcessingStage::FileSaving => 95,
            ProcessingStage::Completed => 100,
        }
    }
}

/// Progress update containing stage and timing information
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub stage: ProcessingStage,
    /// Progress percentage (0-100)
    pub progress: u8,
    pub description: String,
    /// Elapsed time since the run started (milliseconds)
    pub elapsed_ms: u64,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(stage: ProcessingStage, start_time: Instant) -> Self {
        Self {
            progress: stage.progress_percentage(),
            description: stage.description().to_string(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            stage,
        }
    }
}

/// Trait for reporting progress during compositing
pub trait ProgressReporter: Send + Sync {
    /// Report a progress update
    fn report_progress(&self, update: ProgressUpdate);

    /// Report completion with final timings
    fn report_completion(&self, timings: &StageTimings);

    /// Report an error during processing
    fn report_error(&self, stage: ProcessingStage, error: &str);
}

/// No-op progress reporter that discards all progress updates
#[derive(Debug, Default)]
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _update: ProgressUpdate) {}

    fn report_completion(&self, _timings: &StageTimings) {}

    fn report_error(&self, _stage: ProcessingStage, _error: &str) {}
}

/// Console progress reporter that logs progress through the `log` facade
#[derive(Debug)]
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    /// Create a new console progress reporter
    ///
    /// # Arguments
    /// * `verbose` - Whether to show elapsed times and the timing breakdown
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if self.verbose {
            log::info!(
                "[{}%] {} ({}ms elapsed)",
                update.progress,
                update.description,
                update.elapsed_ms
            );
        } else {
            log::info!("[{}%] {}", update.progress, update.description);
        }
    }

    fn report_completion(&self, timings: &StageTimings) {
        log::info!("✅ Composite completed in {}ms", timings.total_ms);

        if self.verbose {
            log::info!("  📊 Detailed timings:");
            log::info!("    • Image load: {}ms", timings.image_load_ms);
            log::info!("    • Segmentation: {}ms", timings.segmentation_ms);
            log::info!("    • Placement: {}ms", timings.placement_ms);
            log::info!("    • Shadow: {}ms", timings.shadow_ms);
            log::info!("    • Harmonization: {}ms", timings.harmonization_ms);
            log::info!("    • Compositing: {}ms", timings.compositing_ms);
            if let Some(encode) = timings.image_encode_ms {
                log::info!("    • Encoding: {}ms", encode);
            }
        }
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        log::error!("❌ Error during {}: {}", stage.description(), error);
    }
}

/// Tracks the current stage and elapsed time for one run
pub struct ProgressTracker<'a> {
    reporter: &'a dyn ProgressReporter,
    start_time: Instant,
    current_stage: Option<ProcessingStage>,
}

impl<'a> ProgressTracker<'a> {
    #[must_use]
    pub fn new(reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            reporter,
            start_time: Instant::now(),
            current_stage: None,
        }
    }

    /// Report progress for a specific stage
    pub fn report_stage(&mut self, stage: ProcessingStage) {
        self.current_stage = Some(stage);
        self.reporter
            .report_progress(ProgressUpdate::new(stage, self.start_time));
    }

    /// Report completion with final timings
    pub fn report_completion(&mut self, timings: &StageTimings) {
        self.report_stage(ProcessingStage::Completed);
        self.reporter.report_completion(timings);
    }

    /// Report an error against the current stage
    pub fn report_error(&self, error: &str) {
        let stage = self.current_stage.unwrap_or(ProcessingStage::InputLoading);
        self.reporter.report_error(stage, error);
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    #[must_use]
    pub fn current_stage(&self) -> Option<ProcessingStage> {
        self.current_stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Test progress reporter that captures reports for verification
    #[derive(Default)]
    struct TestProgressReporter {
        progress_updates: Arc<Mutex<Vec<ProgressUpdate>>>,
        completions: Arc<Mutex<Vec<StageTimings>>>,
        errors: Arc<Mutex<Vec<(ProcessingStage, String)>>>,
    }

    impl ProgressReporter for TestProgressReporter {
        fn report_progress(&self, update: ProgressUpdate) {
            self.progress_updates.lock().unwrap().push(update);
        }

        fn report_completion(&self, timings: &StageTimings) {
            self.completions.lock().unwrap().push(timings.clone());
        }

        fn report_error(&self, stage: ProcessingStage, error: &str) {
            self.errors.lock().unwrap().push((stage, error.to_string()));
        }
    }

    #[test]
    fn test_processing_stage_descriptions() {
        assert_eq!(ProcessingStage::InputLoading.description(), "Loading input images");
        assert_eq!(ProcessingStage::ShadowSynthesis.description(), "Synthesizing cast shadow");
        assert_eq!(ProcessingStage::Completed.description(), "Compositing completed");
    }

    #[test]
    fn test_progress_percentages_increase() {
        let stages = [
            ProcessingStage::InputLoading,
            ProcessingStage::Segmentation,
            ProcessingStage::Placement,
            ProcessingStage::ShadowSynthesis,
            ProcessingStage::ColorHarmonization,
            ProcessingStage::Compositing,
            ProcessingStage::FileSaving,
            ProcessingStage::Completed,
        ];
        for pair in stages.windows(2) {
            assert!(pair[0].progress_percentage() < pair[1].progress_percentage());
        }
        assert_eq!(ProcessingStage::Completed.progress_percentage(), 100);
    }

    #[test]
    fn test_tracker_reports_stages_and_errors() {
        let reporter = TestProgressReporter::default();
        let mut tracker = ProgressTracker::new(&reporter);
        assert!(tracker.current_stage().is_none());

        tracker.report_stage(ProcessingStage::InputLoading);
        tracker.report_stage(ProcessingStage::Segmentation);
        tracker.report_error("backend crashed");
        tracker.report_completion(&StageTimings::default());

        let updates = reporter.progress_updates.lock().unwrap();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[1].stage, ProcessingStage::Segmentation);
        assert_eq!(updates[2].progress, 100);

        let errors = reporter.errors.lock().unwrap();
        assert_eq!(errors[0], (ProcessingStage::Segmentation, "backend crashed".to_string()));
        assert_eq!(reporter.completions.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_console_and_noop_reporters_do_not_panic() {
        let timings = StageTimings {
            image_encode_ms: Some(3),
            ..StageTimings::default()
        };
        for reporter in [
            Box::new(NoOpProgressReporter) as Box<dyn ProgressReporter>,
            Box::new(ConsoleProgressReporter::new(true)),
            Box::new(ConsoleProgressReporter::new(false)),
        ] {
            reporter.report_progress(ProgressUpdate::new(ProcessingStage::Placement, Instant::now()));
            reporter.report_completion(&timings);
            reporter.report_error(ProcessingStage::Compositing, "boom");
        }
    }
}
