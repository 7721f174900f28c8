//! Segmentation backend factory for the CLI

use super::main_impl::{Cli, CliSegmenter};
use crate::segmentation::{AlphaMatteBackend, CommandBackend, MaskFileBackend, SegmentationBackend};
use anyhow::{Context, Result};

/// Creates the segmentation backend selected on the command line
#[derive(Debug)]
pub(crate) struct CliBackendFactory;

impl CliBackendFactory {
    pub(crate) fn create_backend(cli: &Cli) -> Result<Box<dyn SegmentationBackend>> {
        match cli.segmenter {
            CliSegmenter::Alpha => Ok(Box::new(AlphaMatteBackend::new())),
            CliSegmenter::MaskFile => {
                let mask = cli
                    .mask
                    .clone()
                    .context("--segmenter mask-file requires --mask PATH")?;
                Ok(Box::new(MaskFileBackend::new(mask)))
            },
            CliSegmenter::Command => {
                let backend = CommandBackend::from_command_line(&cli.segment_command)
                    .context("Invalid --segment-command")?;
                Ok(Box::new(backend))
            },
        }
    }
}
