//! Configuration types for compositing operations

use crate::error::{CompositeError, Result};
use crate::utils::NumericValidator;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Output image format options for the final composite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossless PNG
    Png,
    /// JPEG with configurable quality
    #[default]
    Jpeg,
    /// Lossless TIFF
    Tiff,
}

impl OutputFormat {
    /// Pick the output format from a file name's extension
    ///
    /// # Errors
    /// - Missing or unsupported extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "tif" | "tiff" => Ok(Self::Tiff),
            other => Err(CompositeError::invalid_parameter(format!(
                "unsupported output extension '{}' for '{}' (use png, jpg or tiff)",
                other,
                path.as_ref().display()
            ))),
        }
    }

    /// Get the image crate format for this output
    #[must_use]
    pub fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Tiff => image::ImageFormat::Tiff,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => write!(f, "png"),
            Self::Jpeg => write!(f, "jpeg"),
            Self::Tiff => write!(f, "tiff"),
        }
    }
}

/// Where the subject and background images are read from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Directory holding both input images
    pub dir: PathBuf,
    /// Subject (person) photo file name, relative to `dir`
    pub subject: PathBuf,
    /// Background photo file name, relative to `dir`
    pub background: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("input"),
            subject: PathBuf::from("person_original.jpg"),
            background: PathBuf::from("background.jpg"),
        }
    }
}

impl InputConfig {
    /// Resolved subject path
    #[must_use]
    pub fn subject_path(&self) -> PathBuf {
        self.dir.join(&self.subject)
    }

    /// Resolved background path
    #[must_use]
    pub fn background_path(&self) -> PathBuf {
        self.dir.join(&self.background)
    }
}

/// Destination of the scaled subject on the background canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placement {
    /// Top-left x coordinate on the canvas (may be negative)
    pub x: i32,
    /// Top-left y coordinate on the canvas (may be negative)
    pub y: i32,
    /// Positive scale factor applied to the subject
    pub scale: f64,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            x: 450,
            y: 280,
            scale: 0.85,
        }
    }
}

impl Placement {
    #[must_use]
    pub fn new(x: i32, y: i32, scale: f64) -> Self {
        Self { x, y, scale }
    }

    /// Validate the scale factor
    pub fn validate(&self) -> Result<()> {
        NumericValidator::validate_positive(self.scale, "scale factor")?;
        Ok(())
    }
}

/// Shear vector describing shadow skew direction and strength
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightDirection {
    pub dx: f64,
    pub dy: f64,
}

impl Default for LightDirection {
    fn default() -> Self {
        Self { dx: 0.7, dy: 0.3 }
    }
}

impl LightDirection {
    #[must_use]
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// Validate the components and shear invertibility
    pub fn validate(&self) -> Result<()> {
        NumericValidator::validate_shear(self.dx, self.dy)?;
        Ok(())
    }
}

/// Blur and opacity of the cast shadow
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowParams {
    /// Gaussian kernel size, positive and odd
    pub blur_kernel: u32,
    /// Shadow opacity in [0, 1]
    pub opacity: f64,
}

impl Default for ShadowParams {
    fn default() -> Self {
        Self {
            blur_kernel: 91,
            opacity: 0.65,
        }
    }
}

impl ShadowParams {
    #[must_use]
    pub fn new(blur_kernel: u32, opacity: f64) -> Self {
        Self {
            blur_kernel,
            opacity,
        }
    }

    /// Validate kernel size and opacity
    pub fn validate(&self) -> Result<()> {
        NumericValidator::validate_unit_interval(self.opacity, "shadow opacity")?;
        NumericValidator::validate_odd_kernel(self.blur_kernel, "shadow blur kernel")?;
        Ok(())
    }
}

/// Statistic-matching policy used to harmonize the foreground
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum HarmonizationStrategy {
    /// Per-channel mean and standard deviation transfer in Lab
    #[default]
    MeanVariance,
    /// Lightness-only mean shift scaled by a gain
    MeanShift,
}

impl std::fmt::Display for HarmonizationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MeanVariance => write!(f, "mean-variance"),
            Self::MeanShift => write!(f, "mean-shift"),
        }
    }
}

/// Color harmonization settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarmonizationConfig {
    pub strategy: HarmonizationStrategy,
    /// Gain applied to the source lightness mean in mean-shift mode
    pub mean_shift_gain: f64,
}

impl Default for HarmonizationConfig {
    fn default() -> Self {
        Self {
            strategy: HarmonizationStrategy::default(),
            mean_shift_gain: 1.7,
        }
    }
}

impl HarmonizationConfig {
    /// Validate the gain (checked regardless of the active strategy)
    pub fn validate(&self) -> Result<()> {
        NumericValidator::validate_positive(self.mean_shift_gain, "mean-shift gain")?;
        Ok(())
    }
}

/// Gaussian grain added to the final blend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrainConfig {
    /// Standard deviation in normalized [0, 1] units; 0 disables grain
    pub std_dev: f64,
    /// Fixed seed for reproducible output; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for GrainConfig {
    fn default() -> Self {
        Self {
            std_dev: 0.01,
            seed: None,
        }
    }
}

impl GrainConfig {
    /// Grain disabled entirely
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            std_dev: 0.0,
            seed: None,
        }
    }

    /// Grain with a fixed seed
    #[must_use]
    pub fn seeded(std_dev: f64, seed: u64) -> Self {
        Self {
            std_dev,
            seed: Some(seed),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.std_dev > 0.0
    }

    pub fn validate(&self) -> Result<()> {
        NumericValidator::validate_non_negative(self.std_dev, "noise standard deviation")?;
        Ok(())
    }
}

/// Where and how results are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory, created if absent
    pub dir: PathBuf,
    /// File name of the final composite; extension selects the format
    pub final_name: String,
    /// JPEG quality (0-100, only used for JPEG output)
    pub jpeg_quality: u8,
    /// Write the segmented subject, shadow and harmonized layers too
    pub save_intermediates: bool,
    /// Write a JSON run report next to the outputs
    pub write_report: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            final_name: "final_composite.jpg".to_string(),
            jpeg_quality: 95,
            save_intermediates: true,
            write_report: true,
        }
    }
}

impl OutputConfig {
    /// Resolved path of the final composite
    #[must_use]
    pub fn final_path(&self) -> PathBuf {
        self.dir.join(&self.final_name)
    }

    /// Output format derived from `final_name`
    pub fn format(&self) -> Result<OutputFormat> {
        OutputFormat::from_path(&self.final_name)
    }

    pub fn validate(&self) -> Result<()> {
        NumericValidator::validate_quality(self.jpeg_quality)?;
        self.format()?;
        Ok(())
    }
}

/// Complete configuration for one compositing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CompositeConfig {
    pub input: InputConfig,
    pub placement: Placement,
    pub light_direction: LightDirection,
    pub shadow: ShadowParams,
    pub harmonization: HarmonizationConfig,
    pub grain: GrainConfig,
    pub output: OutputConfig,
}

impl CompositeConfig {
    /// Create a new configuration builder for fluent API construction
    ///
    /// # Examples
    ///
    /// ```rust
    /// use scene_composite::{CompositeConfig, HarmonizationStrategy};
    ///
    /// let config = CompositeConfig::builder()
    ///     .placement(120, 80, 0.5)
    ///     .shadow(31, 0.4)
    ///     .harmonization(HarmonizationStrategy::MeanShift)
    ///     .noise(0.0, None)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.shadow.blur_kernel, 31);
    /// ```
    #[must_use]
    pub fn builder() -> CompositeConfigBuilder {
        CompositeConfigBuilder::default()
    }

    /// Load a configuration from a JSON file; absent fields take defaults
    ///
    /// # Errors
    /// - File cannot be read
    /// - Malformed JSON
    /// - Values outside their valid domain
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content = std::fs::read_to_string(path_ref)
            .map_err(|e| CompositeError::file_io_error("read config file", path_ref, &e))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Non-positive scale factor
    /// - Light direction outside [-1, 1] or a degenerate shear
    /// - Even or zero blur kernel, opacity outside [0, 1]
    /// - Non-positive gain, negative noise
    /// - JPEG quality above 100 or unsupported output extension
    pub fn validate(&self) -> Result<()> {
        self.placement.validate()?;
        self.light_direction.validate()?;
        self.shadow.validate()?;
        self.harmonization.validate()?;
        self.grain.validate()?;
        self.output.validate()?;
        Ok(())
    }
}

/// Builder for `CompositeConfig`
#[derive(Debug, Default)]
pub struct CompositeConfigBuilder {
    config: CompositeConfig,
}

impl CompositeConfigBuilder {
    /// Start from an existing configuration
    #[must_use]
    pub fn from_config(config: CompositeConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn input_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.input.dir = dir.into();
        self
    }

    #[must_use]
    pub fn subject<P: Into<PathBuf>>(mut self, subject: P) -> Self {
        self.config.input.subject = subject.into();
        self
    }

    #[must_use]
    pub fn background<P: Into<PathBuf>>(mut self, background: P) -> Self {
        self.config.input.background = background.into();
        self
    }

    #[must_use]
    pub fn placement(mut self, x: i32, y: i32, scale: f64) -> Self {
        self.config.placement = Placement::new(x, y, scale);
        self
    }

    #[must_use]
    pub fn light_direction(mut self, dx: f64, dy: f64) -> Self {
        self.config.light_direction = LightDirection::new(dx, dy);
        self
    }

    #[must_use]
    pub fn shadow(mut self, blur_kernel: u32, opacity: f64) -> Self {
        self.config.shadow = ShadowParams::new(blur_kernel, opacity);
        self
    }

    #[must_use]
    pub fn harmonization(mut self, strategy: HarmonizationStrategy) -> Self {
        self.config.harmonization.strategy = strategy;
        self
    }

    #[must_use]
    pub fn mean_shift_gain(mut self, gain: f64) -> Self {
        self.config.harmonization.mean_shift_gain = gain;
        self
    }

    #[must_use]
    pub fn noise(mut self, std_dev: f64, seed: Option<u64>) -> Self {
        self.config.grain = GrainConfig { std_dev, seed };
        self
    }

    #[must_use]
    pub fn output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.output.dir = dir.into();
        self
    }

    #[must_use]
    pub fn final_name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.output.final_name = name.into();
        self
    }

    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.output.jpeg_quality = quality;
        self
    }

    #[must_use]
    pub fn save_intermediates(mut self, save: bool) -> Self {
        self.config.output.save_intermediates = save;
        self
    }

    #[must_use]
    pub fn write_report(mut self, write: bool) -> Self {
        self.config.output.write_report = write;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `CompositeError::InvalidParameter` for any value outside its
    /// valid domain (see [`CompositeConfig::validate`]).
    pub fn build(self) -> Result<CompositeConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
