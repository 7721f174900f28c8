//! Consolidated validation utilities
//!
//! Parameter checks shared by the configuration layer and the individual
//! compositing stages, so a value is rejected the same way wherever it is used.

pub mod numeric;

pub use numeric::NumericValidator;
