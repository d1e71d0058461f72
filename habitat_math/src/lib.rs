//! # Habitat Math
//!
//! Numeric kernels shared by the habitat suitability pipeline.
//! This crate provides the per-variable suitability rule shapes and the
//! planar distance helpers used by the spatial radius estimator.

use thiserror::Error;

pub mod spatial;
pub mod suitability;

pub use spatial::{planar_distance_km, DistanceBins, Position};
pub use suitability::ScoreRule;

/// Errors that can occur in habitat-related calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid rule bound: {0}")]
    InvalidBound(String),
}

/// Result type for habitat math operations
pub type Result<T> = std::result::Result<T, MathError>;
