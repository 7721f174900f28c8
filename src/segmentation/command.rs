//! Backend delegating to an external matting program
//!
//! The program receives the encoded subject on stdin and must write an
//! encoded image with an alpha channel to stdout, e.g. `rembg i - -`.

use super::SegmentationBackend;
use crate::error::{CompositeError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs an external command for background removal
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
}

impl CommandBackend {
    #[must_use]
    pub fn new<S: Into<String>>(program: S, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parse a whitespace-separated command line
    ///
    /// # Errors
    /// - `InvalidParameter` for an empty command line
    pub fn from_command_line(command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| CompositeError::invalid_parameter("segmentation command is empty"))?;
        Ok(Self::new(program, parts.collect()))
    }

    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl SegmentationBackend for CommandBackend {
    fn name(&self) -> &str {
        "command"
    }

    async fn remove_background(&self, image_bytes: &[u8]) -> Result<Vec<u8>> {
        debug!(command = %self.command_line(), "Spawning segmentation command");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CompositeError::segmentation(format!(
                    "failed to start '{}': {}",
                    self.command_line(),
                    e
                ))
            })?;

        // stdin is fed while stdout is drained
        let stdin = child.stdin.take();
        let input = image_bytes.to_vec();
        let writer = tokio::spawn(async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&input).await?;
                stdin.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        });

        let output = child.wait_with_output().await.map_err(|e| {
            CompositeError::segmentation(format!("'{}' did not complete: {}", self.command_line(), e))
        })?;

        match writer.await {
            Ok(Ok(())) => {},
            // Programs may exit before consuming all input; the exit status decides
            Ok(Err(e)) => warn!(error = %e, "Segmentation command closed stdin early"),
            Err(e) => warn!(error = %e, "Segmentation stdin writer aborted"),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CompositeError::segmentation(format!(
                "'{}' exited with {}: {}",
                self.command_line(),
                output.status,
                stderr.trim()
            )));
        }

        if output.stdout.is_empty() {
            return Err(CompositeError::segmentation(format!(
                "'{}' produced no output",
                self.command_line()
            )));
        }

        debug!(output_bytes = output.stdout.len(), "Segmentation command finished");
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_line() {
        let backend = CommandBackend::from_command_line("rembg i  - -").unwrap();
        assert_eq!(backend.program, "rembg");
        assert_eq!(backend.args, vec!["i", "-", "-"]);
        assert_eq!(backend.command_line(), "rembg i - -");

        assert!(CommandBackend::from_command_line("   ").unwrap_err().is_invalid_parameter());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_echo_command_round_trips_bytes() {
        use crate::segmentation::{encode_png, segment_subject};
        use image::{Rgba, RgbaImage};

        let image = RgbaImage::from_pixel(5, 5, Rgba([1, 2, 3, 200]));
        let bytes = encode_png(&image).unwrap();

        let backend = CommandBackend::new("cat", Vec::new());
        let subject = segment_subject(&backend, &bytes).await.unwrap();
        assert!(subject.mask.pixels().all(|p| p.0[0] == 200));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_command_reports_status() {
        let backend = CommandBackend::new("false", Vec::new());
        let err = backend.remove_background(b"input").await.unwrap_err();
        assert!(matches!(err, CompositeError::Segmentation(_)));
        assert!(err.to_string().contains("exited with"));
    }

    #[tokio::test]
    async fn test_missing_program_reports_spawn_failure() {
        let backend = CommandBackend::new("scene-composite-no-such-matting-tool", Vec::new());
        let err = backend.remove_background(b"input").await.unwrap_err();
        assert!(err.to_string().contains("failed to start"));
    }
}
