//! # Habitat Forecast
//!
//! Rolling water-quality forecasts, habitat suitability scoring and spatial
//! radius-of-validity estimation for coastal aquaculture stations.
//!
//! ## Features
//!
//! - Historical station tables loaded with polars (`DataLoader`)
//! - Fitted multi-output regressors behind the `Regressor` trait, with a
//!   versioned feature schema stored next to each model
//! - Auto-regressive rolling forecasts for the metal group and the
//!   species-specific environmental group
//! - Habitat Suitability Index (HSI) scoring for oyster and cobia
//! - Radius of validity (R_km) per station and quarter
//! - Batch runs across stations on a bounded worker pool with per-station
//!   failure isolation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use habitat_forecast::{Pipeline, PipelineConfig, Species};
//! use habitat_forecast::radius::{estimate_table, RadiusParams};
//!
//! let config = PipelineConfig::from_file("pipeline.json")?;
//! let pipeline = Pipeline::from_config(&config)?;
//!
//! // Forecast and score every station
//! let report = pipeline.run_species(Species::Oyster, config.forecast.start()?, 4)?;
//! for (station, failure) in report.failures() {
//!     eprintln!("{}: {}", station.station, failure.kind);
//! }
//!
//! // Radius of validity for every station and quarter
//! let radii = estimate_table(&report.hsi_table(), RadiusParams::batch())?;
//! # Ok::<(), habitat_forecast::ForecastError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod forecast;
pub mod geo;
pub mod hsi;
pub mod merge;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod quarter;
pub mod radius;
pub mod registry;
pub mod species;

// Re-export commonly used types
pub use crate::config::PipelineConfig;
pub use crate::data::{DataLoader, HistoryTable, LagWindow, StationInfo, StationMatch};
pub use crate::error::{ForecastError, Result};
pub use crate::forecast::{ForecastRecord, RollingForecaster, VariableGroup, METAL_VARIABLES};
pub use crate::hsi::{HsiLevel, HsiRecord, HsiTableRow, RuleBook};
pub use crate::models::{FeatureSchema, Regressor, TrainedModel};
pub use crate::pipeline::{BatchReport, Pipeline, StationFailure, StationOutcome};
pub use crate::quarter::Quarter;
pub use crate::radius::{RadiusParams, RadiusRecord, SpatialSnapshot};
pub use crate::registry::ModelRegistry;
pub use crate::species::Species;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
