//! Image I/O operations service
//!
//! Keeps file access out of the compositing stages so they operate on
//! in-memory buffers only.

use crate::{
    config::OutputFormat,
    error::{CompositeError, Result},
};
use image::{codecs::jpeg::JpegEncoder, DynamicImage};
use serde::Serialize;
use std::{fs::File, io::BufWriter, path::Path};

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Read the raw bytes of an input file
    ///
    /// # Errors
    /// - `MissingInputFile` if the path does not exist
    /// - `Io` for other read failures
    pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        let path_ref = path.as_ref();
        if !path_ref.is_file() {
            return Err(CompositeError::MissingInputFile(path_ref.to_path_buf()));
        }

        std::fs::read(path_ref).map_err(|e| CompositeError::file_io_error("read input file", path_ref, &e))
    }

    /// Decode image bytes read from `path`
    ///
    /// # Errors
    /// - `UnreadableImage` if the bytes are not a supported image
    pub fn load_from_bytes<P: AsRef<Path>>(bytes: &[u8], path: P) -> Result<DynamicImage> {
        image::load_from_memory(bytes).map_err(|e| CompositeError::unreadable_image(path, e))
    }

    /// Load an image from a file path
    ///
    /// # Errors
    /// - `MissingInputFile` if the path does not exist
    /// - `UnreadableImage` if the file is not a decodable image
    ///
    /// # Examples
    /// ```rust,no_run
    /// use scene_composite::services::ImageIOService;
    ///
    /// let image = ImageIOService::load_image("input/background.jpg")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();
        let bytes = Self::read_bytes(path_ref)?;
        let image = Self::load_from_bytes(&bytes, path_ref)?;
        log::debug!(
            "Loaded {} ({}x{}, {} bytes)",
            path_ref.display(),
            image.width(),
            image.height(),
            bytes.len()
        );
        Ok(image)
    }

    /// Create a directory and its parents if absent
    pub fn ensure_dir<P: AsRef<Path>>(dir: P) -> Result<()> {
        let dir_ref = dir.as_ref();
        std::fs::create_dir_all(dir_ref)
            .map_err(|e| CompositeError::file_io_error("create output directory", dir_ref, &e))
    }

    /// Save an image in the given format
    ///
    /// JPEG output drops any alpha channel and uses `quality`; other formats
    /// ignore it. The parent directory is created if needed.
    ///
    /// # Errors
    /// - `Io` if the file or directory cannot be created
    /// - `Image` if encoding fails
    pub fn save_image<P: AsRef<Path>>(
        image: &DynamicImage,
        path: P,
        format: OutputFormat,
        quality: u8,
    ) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            Self::ensure_dir(parent)?;
        }

        match format {
            OutputFormat::Jpeg => {
                let file = File::create(path_ref)
                    .map_err(|e| CompositeError::file_io_error("create output file", path_ref, &e))?;
                let mut encoder = JpegEncoder::new_with_quality(BufWriter::new(file), quality);
                encoder.encode_image(&image.to_rgb8())?;
            },
            OutputFormat::Png | OutputFormat::Tiff => {
                image.save_with_format(path_ref, format.image_format())?;
            },
        }

        log::debug!("Saved {} as {}", path_ref.display(), format);
        Ok(())
    }

    /// Write a value as pretty-printed JSON
    ///
    /// # Errors
    /// - `Serialization` if the value cannot be serialized
    /// - `Io` if the file cannot be written
    pub fn write_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
        let path_ref = path.as_ref();
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(path_ref, json)
            .map_err(|e| CompositeError::file_io_error("write report", path_ref, &e))
    }

    /// Check if a file path has a supported input image extension
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .is_some_and(|ext| matches!(ext.as_str(), "jpg" | "jpeg" | "png" | "tif" | "tiff"))
    }
}
