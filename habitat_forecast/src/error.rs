//! Error types for the habitat_forecast crate

use std::path::PathBuf;
use thiserror::Error;

/// Custom error types for the habitat_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Fewer than four historical quarters for a station
    #[error("Insufficient history for station {station}: need 4 quarters, have {available}")]
    InsufficientHistory { station: String, available: usize },

    /// Species discriminator outside the supported set
    #[error("Invalid species: {0:?} (expected \"oyster\" or \"cobia\")")]
    InvalidSpecies(String),

    /// Model or feature-schema file is missing
    #[error("Missing model artifact: {}", .0.display())]
    MissingModelArtifact(PathBuf),

    /// Feature list does not match what the model or forecaster expects
    #[error("Feature mismatch: {0}")]
    FeatureMismatch(String),

    /// Metal and non-metal forecasts cover different quarters
    #[error("Join mismatch: {left} non-metal rows and {right} metal rows, {matched} matched on (year, quarter)")]
    JoinMismatch {
        left: usize,
        right: usize,
        matched: usize,
    },

    /// Misconfigured HSI rule table
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    /// Station not present in the historical table
    #[error("Station not found: {0}")]
    StationNotFound(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error raised while evaluating a model
    #[error("Model error: {0}")]
    ModelError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from JSON (de)serialization
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error from CSV reading or writing
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from the numeric kernels
    #[error("Math error: {0}")]
    MathError(#[from] habitat_math::MathError),
}

impl ForecastError {
    /// Short stable name of the failure, used in batch outcome lists
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::InsufficientHistory { .. } => "insufficient_history",
            ForecastError::InvalidSpecies(_) => "invalid_species",
            ForecastError::MissingModelArtifact(_) => "missing_model_artifact",
            ForecastError::FeatureMismatch(_) => "feature_mismatch",
            ForecastError::JoinMismatch { .. } => "join_mismatch",
            ForecastError::InvalidRule(_) => "invalid_rule",
            ForecastError::StationNotFound(_) => "station_not_found",
            ForecastError::InvalidParameter(_) => "invalid_parameter",
            ForecastError::DataError(_) => "data_error",
            ForecastError::ModelError(_) => "model_error",
            ForecastError::IoError(_) => "io_error",
            ForecastError::PolarsError(_) => "polars_error",
            ForecastError::JsonError(_) => "json_error",
            ForecastError::CsvError(_) => "csv_error",
            ForecastError::MathError(_) => "math_error",
        }
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<polars::prelude::PolarsError> for ForecastError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}
