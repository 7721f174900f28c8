//! Numeric validation utilities
//!
//! Provides range and domain checks for compositing parameters. Every check
//! returns the validated value so it can be used inline.

use crate::error::{CompositeError, Result};

/// Smallest |determinant| accepted for the shadow shear matrix
pub const MIN_SHEAR_DETERMINANT: f64 = 1e-6;

/// Validator for numeric compositing parameters
pub struct NumericValidator;

impl NumericValidator {
    /// Validate that a value is finite (not NaN or infinite)
    pub fn validate_finite(value: f64, name: &str) -> Result<f64> {
        if !value.is_finite() {
            return Err(CompositeError::invalid_parameter(format!(
                "{} must be finite, got {}",
                name, value
            )));
        }
        Ok(value)
    }

    /// Validate a value in the closed unit interval [0, 1]
    pub fn validate_unit_interval(value: f64, name: &str) -> Result<f64> {
        Self::validate_finite(value, name)?;

        if !(0.0..=1.0).contains(&value) {
            return Err(CompositeError::config_value_error(name, value, "0.0-1.0"));
        }

        Ok(value)
    }

    /// Validate that a value is strictly positive and finite
    pub fn validate_positive(value: f64, name: &str) -> Result<f64> {
        Self::validate_finite(value, name)?;

        if value <= 0.0 {
            return Err(CompositeError::invalid_parameter(format!(
                "{} must be positive, got {}",
                name, value
            )));
        }
        Ok(value)
    }

    /// Validate that a value is finite and not negative
    pub fn validate_non_negative(value: f64, name: &str) -> Result<f64> {
        Self::validate_finite(value, name)?;

        if value < 0.0 {
            return Err(CompositeError::invalid_parameter(format!(
                "{} must not be negative, got {}",
                name, value
            )));
        }
        Ok(value)
    }

    /// Validate numeric range (inclusive)
    pub fn validate_range<T>(value: T, min: T, max: T, name: &str) -> Result<T>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(CompositeError::invalid_parameter(format!(
                "{} must be between {} and {}, got {}",
                name, min, max, value
            )));
        }
        Ok(value)
    }

    /// Validate a blur kernel size: positive and odd
    pub fn validate_odd_kernel(size: u32, name: &str) -> Result<u32> {
        if size == 0 || size % 2 == 0 {
            return Err(CompositeError::invalid_parameter(format!(
                "{} must be a positive odd integer, got {}",
                name, size
            )));
        }
        Ok(size)
    }

    /// Validate a light direction vector used as a shadow shear
    ///
    /// Both components must be finite and lie in [-1, 1], and the shear
    /// matrix `[[1, dx], [dy, 1]]` must be invertible.
    pub fn validate_shear(dx: f64, dy: f64) -> Result<(f64, f64)> {
        Self::validate_finite(dx, "light direction dx")?;
        Self::validate_finite(dy, "light direction dy")?;
        Self::validate_range(dx, -1.0, 1.0, "light direction dx")?;
        Self::validate_range(dy, -1.0, 1.0, "light direction dy")?;

        let determinant = 1.0 - dx * dy;
        if determinant.abs() < MIN_SHEAR_DETERMINANT {
            return Err(CompositeError::invalid_parameter(format!(
                "light direction ({}, {}) produces a degenerate shear (determinant {})",
                dx, dy, determinant
            )));
        }

        Ok((dx, dy))
    }

    /// Validate quality setting (0-100)
    pub fn validate_quality(value: u8) -> Result<u8> {
        if value > 100 {
            return Err(CompositeError::config_value_error("JPEG quality", value, "0-100"));
        }
        Ok(value)
    }
}
