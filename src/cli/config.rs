//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliHarmonization, CliSegmenter};
use crate::{
    config::{CompositeConfig, HarmonizationStrategy, OutputFormat},
    utils::NumericValidator,
};
use anyhow::{Context, Result};

/// Convert CLI arguments to a validated `CompositeConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the configuration: `--config` file (or defaults), then flag overrides
    pub(crate) fn from_cli(cli: &Cli) -> Result<CompositeConfig> {
        let mut config = match &cli.config {
            Some(path) => CompositeConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => CompositeConfig::default(),
        };

        if let Some(dir) = &cli.input_dir {
            config.input.dir.clone_from(dir);
        }
        if let Some(subject) = &cli.subject {
            config.input.subject.clone_from(subject);
        }
        if let Some(background) = &cli.background {
            config.input.background.clone_from(background);
        }

        if let Some(x) = cli.dest_x {
            config.placement.x = x;
        }
        if let Some(y) = cli.dest_y {
            config.placement.y = y;
        }
        if let Some(scale) = cli.scale {
            config.placement.scale = scale;
        }

        if let Some(dx) = cli.light_dx {
            config.light_direction.dx = dx;
        }
        if let Some(dy) = cli.light_dy {
            config.light_direction.dy = dy;
        }

        if let Some(kernel) = cli.blur_kernel {
            config.shadow.blur_kernel = kernel;
        }
        if let Some(opacity) = cli.shadow_opacity {
            config.shadow.opacity = opacity;
        }

        if let Some(strategy) = cli.harmonization {
            config.harmonization.strategy = match strategy {
                CliHarmonization::MeanVariance => HarmonizationStrategy::MeanVariance,
                CliHarmonization::MeanShift => HarmonizationStrategy::MeanShift,
            };
        }
        if let Some(gain) = cli.gain {
            config.harmonization.mean_shift_gain = gain;
        }

        if let Some(std_dev) = cli.noise_std {
            config.grain.std_dev = std_dev;
        }
        if cli.seed.is_some() {
            config.grain.seed = cli.seed;
        }

        if let Some(dir) = &cli.output_dir {
            config.output.dir.clone_from(dir);
        }
        if let Some(name) = &cli.output_name {
            config.output.final_name.clone_from(name);
        }
        if let Some(quality) = cli.jpeg_quality {
            config.output.jpeg_quality = quality;
        }
        if cli.no_intermediates {
            config.output.save_intermediates = false;
        }
        if cli.no_report {
            config.output.write_report = false;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Validate CLI arguments for consistency before any file is touched
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if cli.segmenter == CliSegmenter::MaskFile && cli.mask.is_none() {
            anyhow::bail!("--segmenter mask-file requires --mask PATH");
        }

        if let Some(quality) = cli.jpeg_quality {
            NumericValidator::validate_quality(quality).context("Invalid JPEG quality")?;
        }

        if let Some(name) = &cli.output_name {
            OutputFormat::from_path(name).context("Unsupported output file extension")?;
        }

        Ok(())
    }
}
