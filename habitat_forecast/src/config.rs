//! Pipeline configuration
//!
//! A run is described by one JSON document. Relative paths are resolved
//! against the directory holding the configuration file.

use crate::data::StationMatch;
use crate::error::{ForecastError, Result};
use crate::quarter::Quarter;
use crate::radius::RadiusParams;
use crate::species::Species;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A model file and, optionally, its feature schema
///
/// Without `features` the sidecar `<stem>_features.json` is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSource {
    pub model: PathBuf,
    #[serde(default)]
    pub features: Option<PathBuf>,
}

impl ModelSource {
    pub fn new(model: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            features: None,
        }
    }
}

/// Metal model plus one non-metal model per species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub metal: ModelSource,
    pub species: BTreeMap<Species, ModelSource>,
}

/// First forecast quarter and horizon
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastWindow {
    pub start_year: i32,
    pub start_quarter: u8,
    pub n_quarters: usize,
}

impl ForecastWindow {
    pub fn start(&self) -> Result<Quarter> {
        Quarter::new(self.start_year, self.start_quarter)
    }
}

fn default_workers() -> usize {
    4
}

fn default_radius() -> RadiusParams {
    RadiusParams::batch()
}

fn default_species() -> Vec<Species> {
    Species::ALL.to_vec()
}

/// Configuration of a full forecast, HSI and radius run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Cleaned historical table (station, quarter, x, y, variables)
    pub history_csv: PathBuf,
    /// Station coordinate table; stations come from the history when absent
    #[serde(default)]
    pub stations_csv: Option<PathBuf>,
    /// How stations are located in the history
    #[serde(default)]
    pub station_match: StationMatch,
    pub models: ModelConfig,
    /// HSI rule tables; built-in tables when absent
    #[serde(default)]
    pub rules: Option<PathBuf>,
    pub forecast: ForecastWindow,
    #[serde(default = "default_species")]
    pub species: Vec<Species>,
    #[serde(default = "default_radius")]
    pub radius: RadiusParams,
    #[serde(default = "default_workers")]
    pub workers: usize,
    pub output_dir: PathBuf,
}

impl PipelineConfig {
    /// Read, resolve and validate a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::from_json(&fs::read_to_string(path)?)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration document without resolving or validating it.
    ///
    /// Species names are checked first so an unknown one is reported as
    /// `InvalidSpecies` rather than as a JSON error.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_str(text)?;
        let listed = raw
            .get("species")
            .and_then(serde_json::Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(serde_json::Value::as_str);
        let modelled = raw
            .pointer("/models/species")
            .and_then(serde_json::Value::as_object)
            .into_iter()
            .flat_map(|models| models.keys().map(String::as_str));
        for name in listed.chain(modelled) {
            name.parse::<Species>()?;
        }
        Ok(serde_json::from_value(raw)?)
    }

    /// Make every relative path relative to `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        resolve(&mut self.history_csv);
        resolve(&mut self.output_dir);
        for source in std::iter::once(&mut self.models.metal).chain(self.models.species.values_mut()) {
            resolve(&mut source.model);
            if let Some(features) = source.features.as_mut() {
                resolve(features);
            }
        }
        for path in [self.stations_csv.as_mut(), self.rules.as_mut()].into_iter().flatten() {
            resolve(path);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.forecast.n_quarters == 0 {
            return Err(ForecastError::InvalidParameter(
                "forecast.n_quarters must be at least 1".to_string(),
            ));
        }
        self.forecast.start()?;

        if !(self.radius.max_dist_km.is_finite() && self.radius.max_dist_km > 0.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "radius.max_dist_km must be positive, got {}",
                self.radius.max_dist_km
            )));
        }
        if !(self.radius.bin_km.is_finite() && self.radius.bin_km > 0.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "radius.bin_km must be positive, got {}",
                self.radius.bin_km
            )));
        }
        if self.workers == 0 {
            return Err(ForecastError::InvalidParameter(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.species.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "At least one species must be configured".to_string(),
            ));
        }
        if let Some(species) = self
            .species
            .iter()
            .find(|s| !self.models.species.contains_key(s))
        {
            return Err(ForecastError::InvalidParameter(format!(
                "No model configured for {}",
                species
            )));
        }
        Ok(())
    }
}
