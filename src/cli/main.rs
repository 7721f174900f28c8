//! Scene compositing CLI tool
//!
//! Command-line interface over `CompositePipeline`: one subject, one
//! background, one composite per invocation.

use super::{backend_factory::CliBackendFactory, config::CliConfigBuilder};
use crate::{
    pipeline::{CompositePipeline, REPORT_FILE},
    services::{ConsoleProgressReporter, ProcessingStage, ProgressReporter, ProgressUpdate},
    tracing_config::{TracingConfig, TracingFormat},
    types::StageTimings,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::PathBuf;
use tracing::debug;

/// Photorealistic subject-over-background compositing
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "scene-composite")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Subject photo, relative to the input directory [default: person_original.jpg]
    #[arg(long, value_name = "PATH")]
    pub subject: Option<PathBuf>,

    /// Background photo, relative to the input directory [default: background.jpg]
    #[arg(long, value_name = "PATH")]
    pub background: Option<PathBuf>,

    /// Directory holding the input images [default: input]
    #[arg(long, value_name = "DIR")]
    pub input_dir: Option<PathBuf>,

    /// Directory receiving the composite and intermediates [default: output]
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// File name of the final composite; the extension picks PNG, JPEG or TIFF
    #[arg(long, value_name = "NAME")]
    pub output_name: Option<String>,

    /// JSON configuration file; flags override its values
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Canvas x coordinate of the subject's top-left corner
    #[arg(long, allow_negative_numbers = true)]
    pub dest_x: Option<i32>,

    /// Canvas y coordinate of the subject's top-left corner
    #[arg(long, allow_negative_numbers = true)]
    pub dest_y: Option<i32>,

    /// Subject scale factor
    #[arg(short, long)]
    pub scale: Option<f64>,

    /// Horizontal shear of the shadow, in [-1, 1]
    #[arg(long, allow_negative_numbers = true)]
    pub light_dx: Option<f64>,

    /// Vertical shear of the shadow, in [-1, 1]
    #[arg(long, allow_negative_numbers = true)]
    pub light_dy: Option<f64>,

    /// Odd Gaussian kernel size for the shadow blur
    #[arg(long)]
    pub blur_kernel: Option<u32>,

    /// Peak shadow opacity, in [0, 1]
    #[arg(long)]
    pub shadow_opacity: Option<f64>,

    /// Color harmonization strategy
    #[arg(long, value_enum)]
    pub harmonization: Option<CliHarmonization>,

    /// Lightness gain for the mean-shift strategy
    #[arg(long)]
    pub gain: Option<f64>,

    /// Grain standard deviation on the [0, 1] scale (0 disables grain)
    #[arg(long)]
    pub noise_std: Option<f64>,

    /// Grain seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,

    /// JPEG quality (0-100)
    #[arg(long)]
    pub jpeg_quality: Option<u8>,

    /// Segmentation backend
    #[arg(long, value_enum, default_value_t = CliSegmenter::Alpha)]
    pub segmenter: CliSegmenter,

    /// Mask image for the mask-file segmenter
    #[arg(long, value_name = "PATH")]
    pub mask: Option<PathBuf>,

    /// Matting program for the command segmenter (image on stdin, RGBA on stdout)
    #[arg(long, value_name = "CMD", default_value = "rembg i - -")]
    pub segment_command: String,

    /// Skip writing intermediate layers
    #[arg(long)]
    pub no_intermediates: bool,

    /// Skip writing the JSON run report
    #[arg(long)]
    pub no_report: bool,

    /// Show a progress bar instead of stage log lines
    #[arg(long)]
    pub progress: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    pub print_config: bool,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliHarmonization {
    MeanVariance,
    MeanShift,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliSegmenter {
    /// Subject file already carries an alpha matte
    Alpha,
    /// Matte is read from --mask
    MaskFile,
    /// Matte is produced by --segment-command
    Command,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose).context("Failed to initialize tracing")?;

    let outcome = run(&cli).await;
    if let Err(e) = &outcome {
        error!("❌ {:#}", e);
    }
    outcome
}

async fn run(cli: &Cli) -> Result<()> {
    CliConfigBuilder::validate_cli(cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(cli).context("Failed to build configuration")?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let backend = CliBackendFactory::create_backend(cli).context("Failed to create segmenter")?;

    info!("Starting scene composite");
    info!("Subject: {}", config.input.subject_path().display());
    info!("Background: {}", config.input.background_path().display());
    info!(
        "Segmenter: {}, harmonization: {}",
        backend.name(),
        config.harmonization.strategy
    );

    let final_path = config.output.final_path();
    let write_report = config.output.write_report;
    let output_dir = config.output.dir.clone();

    let reporter: Box<dyn ProgressReporter> = if cli.progress {
        Box::new(BarProgressReporter::new()?)
    } else {
        Box::new(ConsoleProgressReporter::new(cli.verbose > 0))
    };

    let pipeline = CompositePipeline::new(config, backend)
        .context("Failed to create compositing pipeline")?
        .with_progress_reporter(reporter);
    debug!(?pipeline, "Pipeline ready");

    let result = pipeline.run_configured().await.context("Compositing failed")?;

    for warning in &result.warnings {
        warn!("⚠️  {}", warning);
    }

    info!(
        "Wrote {} ({}x{})",
        final_path.display(),
        result.dimensions().0,
        result.dimensions().1
    );
    if write_report {
        info!("Report: {}", output_dir.join(REPORT_FILE).display());
    }

    Ok(())
}

/// Initialize tracing based on verbosity level
fn init_tracing(verbose_count: u8) -> Result<()> {
    let config = TracingConfig::new()
        .with_verbosity(verbose_count)
        .with_format(TracingFormat::Console)
        .with_session_id(uuid::Uuid::new_v4().to_string());
    let filter = config.verbosity_to_filter();

    config
        .init()
        .context("Failed to initialize tracing subscriber")?;

    debug!(filter, "Tracing initialized");
    Ok(())
}

/// Progress bar reporter for `--progress`
struct BarProgressReporter {
    bar: ProgressBar,
}

impl BarProgressReporter {
    fn new() -> Result<Self> {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")?
                .progress_chars("#>-"),
        );
        Ok(Self { bar })
    }
}

impl ProgressReporter for BarProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        self.bar.set_position(u64::from(update.progress));
        self.bar.set_message(update.description);
    }

    fn report_completion(&self, timings: &StageTimings) {
        self.bar
            .finish_with_message(format!("done in {}ms", timings.total_ms));
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        self.bar
            .abandon_with_message(format!("failed while {}: {}", stage.description().to_lowercase(), error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("scene-composite").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_defaults() {
        let cli = parse(&[]).unwrap();
        assert!(cli.subject.is_none());
        assert!(cli.dest_x.is_none());
        assert_eq!(cli.segmenter, CliSegmenter::Alpha);
        assert_eq!(cli.segment_command, "rembg i - -");
        assert!(!cli.no_intermediates);
        assert!(!cli.print_config);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_value_enums_use_kebab_case() {
        let cli = parse(&["--harmonization", "mean-shift", "--segmenter", "mask-file"]).unwrap();
        assert_eq!(cli.harmonization, Some(CliHarmonization::MeanShift));
        assert_eq!(cli.segmenter, CliSegmenter::MaskFile);

        assert!(parse(&["--harmonization", "histogram"]).is_err());
    }

    #[test]
    fn test_negative_coordinates_and_shear() {
        let cli = parse(&["--dest-x", "-40", "--light-dx", "-0.7", "-vv"]).unwrap();
        assert_eq!(cli.dest_x, Some(-40));
        assert_eq!(cli.light_dx, Some(-0.7));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_bar_reporter_lifecycle() {
        let reporter = BarProgressReporter::new().unwrap();
        reporter.report_progress(ProgressUpdate::new(ProcessingStage::Placement, instant::Instant::now()));
        assert_eq!(reporter.bar.position(), 50);
        reporter.report_completion(&StageTimings::default());
        assert!(reporter.bar.is_finished());
    }
}
