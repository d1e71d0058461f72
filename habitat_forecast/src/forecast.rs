//! Rolling (auto-regressive) multi-step forecasting
//!
//! Each step builds one feature row from a four-quarter lag window, asks the
//! model for every target, emits the clipped prediction and then pushes the
//! prediction into the window as the newest quarter. Later steps therefore
//! read predictions rather than observations, and forecast error compounds
//! across the horizon.
//!
//! The same engine serves both variable groups:
//! - metals, with explicit `year` and `quarter` covariates
//! - species-specific environmental variables, with a `Quarter_Num` covariate

use crate::data::LagWindow;
use crate::error::{ForecastError, Result};
use crate::models::{FeatureSchema, Regressor, TrainedModel};
use crate::quarter::Quarter;
use crate::species::Species;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::debug;

/// Heavy-metal variables forecast by the shared metal model
pub const METAL_VARIABLES: [&str; 8] = ["CN", "As", "Cd", "Pb", "Cu", "Hg", "Zn", "Total_Cr"];

/// Covariate names of the metal model
pub const YEAR_FEATURE: &str = "year";
pub const QUARTER_FEATURE: &str = "quarter";
/// Covariate name of the non-metal models
pub const QUARTER_NUM_FEATURE: &str = "Quarter_Num";

/// Which variable group a forecaster instance serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableGroup {
    Metal,
    NonMetal(Species),
}

/// Temporal covariates appended to the lag features
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalCovariates {
    /// Raw numeric `year` and `quarter`
    YearAndQuarter,
    /// Quarter number only, for models trained without the year
    QuarterNumber,
}

impl VariableGroup {
    pub fn covariates(&self) -> TemporalCovariates {
        match self {
            VariableGroup::Metal => TemporalCovariates::YearAndQuarter,
            VariableGroup::NonMetal(_) => TemporalCovariates::QuarterNumber,
        }
    }

    /// Check the model targets against the group.
    ///
    /// Metal models must produce exactly the eight metals. Non-metal models
    /// may produce any non-empty set of environmental variables, provided it
    /// does not overlap the metals.
    fn validate_targets(&self, targets: &[String]) -> Result<()> {
        let unique: HashSet<&str> = targets.iter().map(String::as_str).collect();
        if unique.len() != targets.len() {
            return Err(ForecastError::FeatureMismatch(format!(
                "{} model lists duplicate targets: {:?}",
                self, targets
            )));
        }

        match self {
            VariableGroup::Metal => {
                let expected: HashSet<&str> = METAL_VARIABLES.iter().copied().collect();
                if unique != expected {
                    return Err(ForecastError::FeatureMismatch(format!(
                        "Metal model targets {:?} differ from {:?}",
                        targets, METAL_VARIABLES
                    )));
                }
            }
            VariableGroup::NonMetal(_) => {
                if targets.is_empty() {
                    return Err(ForecastError::FeatureMismatch(format!(
                        "{} model has no targets",
                        self
                    )));
                }
                if let Some(metal) = targets.iter().find(|t| METAL_VARIABLES.contains(&t.as_str()))
                {
                    return Err(ForecastError::FeatureMismatch(format!(
                        "{} model predicts metal variable {}",
                        self, metal
                    )));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for VariableGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableGroup::Metal => f.write_str("metal"),
            VariableGroup::NonMetal(species) => write!(f, "non-metal ({})", species),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeatureSource {
    Lag1(usize),
    Lag4(usize),
    Year,
    QuarterNumber,
}

/// Where each model input comes from, compiled once from a feature schema
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePlan {
    sources: Vec<FeatureSource>,
}

impl FeaturePlan {
    /// Map every schema feature to a lag or covariate source.
    ///
    /// A feature that cannot be derived from the lag window or the group's
    /// covariates is an error; nothing is defaulted.
    pub fn compile(schema: &FeatureSchema, group: VariableGroup) -> Result<Self> {
        group.validate_targets(&schema.targets)?;

        let target_index = |name: &str| schema.targets.iter().position(|t| t == name);
        let covariates = group.covariates();

        let sources = schema
            .input_features
            .iter()
            .map(|feature| {
                let source = if let Some(var) = feature.strip_suffix("_lag1") {
                    target_index(var).map(FeatureSource::Lag1)
                } else if let Some(var) = feature.strip_suffix("_lag4") {
                    target_index(var).map(FeatureSource::Lag4)
                } else {
                    match (covariates, feature.as_str()) {
                        (TemporalCovariates::YearAndQuarter, YEAR_FEATURE) => {
                            Some(FeatureSource::Year)
                        }
                        (TemporalCovariates::YearAndQuarter, QUARTER_FEATURE)
                        | (TemporalCovariates::QuarterNumber, QUARTER_NUM_FEATURE) => {
                            Some(FeatureSource::QuarterNumber)
                        }
                        _ => None,
                    }
                };
                source.ok_or_else(|| {
                    ForecastError::FeatureMismatch(format!(
                        "{} feature {:?} cannot be derived from history",
                        group, feature
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { sources })
    }

    /// Number of model inputs
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if the plan has no inputs
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Feature row for the quarter being forecast
    fn row(&self, window: &LagWindow, quarter: Quarter) -> Vec<f64> {
        self.sources
            .iter()
            .map(|source| match *source {
                FeatureSource::Lag1(i) => window.lag1(i),
                FeatureSource::Lag4(i) => window.lag4(i),
                FeatureSource::Year => f64::from(quarter.year()),
                FeatureSource::QuarterNumber => f64::from(quarter.quarter()),
            })
            .collect()
    }
}

/// Forecast values for one quarter
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRecord {
    pub quarter: Quarter,
    pub values: BTreeMap<String, f64>,
}

impl ForecastRecord {
    pub fn new(quarter: Quarter, values: BTreeMap<String, f64>) -> Self {
        Self { quarter, values }
    }

    pub fn year(&self) -> i32 {
        self.quarter.year()
    }

    pub fn quarter_number(&self) -> u8 {
        self.quarter.quarter()
    }

    /// Value of a variable, `None` when the variable is not part of the record
    pub fn get(&self, variable: &str) -> Option<f64> {
        self.values.get(variable).copied()
    }
}

/// Physical non-negativity; `NaN` stays missing
fn clip_non_negative(value: f64) -> f64 {
    if value < 0.0 {
        0.0
    } else {
        value
    }
}

/// Auto-regressive forecaster bound to one model and variable group
#[derive(Debug)]
pub struct RollingForecaster<'a> {
    model: &'a dyn Regressor,
    targets: &'a [String],
    plan: FeaturePlan,
    group: VariableGroup,
}

impl<'a> RollingForecaster<'a> {
    /// Create a forecaster, validating the schema against the model and group
    pub fn new(
        model: &'a dyn Regressor,
        schema: &'a FeatureSchema,
        group: VariableGroup,
    ) -> Result<Self> {
        if model.n_features() != schema.input_features.len()
            || model.n_outputs() != schema.targets.len()
        {
            return Err(ForecastError::FeatureMismatch(format!(
                "{} model shape ({} -> {}) does not match schema ({} -> {})",
                group,
                model.n_features(),
                model.n_outputs(),
                schema.input_features.len(),
                schema.targets.len()
            )));
        }

        Ok(Self {
            model,
            targets: &schema.targets,
            plan: FeaturePlan::compile(schema, group)?,
            group,
        })
    }

    /// Create a forecaster from a loaded model artifact
    pub fn from_trained(model: &'a TrainedModel, group: VariableGroup) -> Result<Self> {
        Self::new(model.regressor(), model.schema(), group)
    }

    /// Variables produced by every step, in model output order
    pub fn targets(&self) -> &[String] {
        self.targets
    }

    /// Forecast `n_quarters` consecutive quarters starting at `start`.
    ///
    /// `history` must track exactly the model targets, in model order.
    pub fn forecast(
        &self,
        history: &LagWindow,
        start: Quarter,
        n_quarters: usize,
    ) -> Result<Vec<ForecastRecord>> {
        if n_quarters == 0 {
            return Err(ForecastError::InvalidParameter(
                "n_quarters must be at least 1".to_string(),
            ));
        }
        if history.variables() != self.targets {
            return Err(ForecastError::FeatureMismatch(format!(
                "History tracks {:?} but the {} model predicts {:?}",
                history.variables(),
                self.group,
                self.targets
            )));
        }

        let mut window = history.clone();
        let mut quarter = start;
        let mut records = Vec::with_capacity(n_quarters);

        for _ in 0..n_quarters {
            let row = self.plan.row(&window, quarter);
            let predicted = self.model.predict(&row)?;
            if predicted.len() != self.targets.len() {
                return Err(ForecastError::ModelError(format!(
                    "{} model returned {} values for {} targets",
                    self.group,
                    predicted.len(),
                    self.targets.len()
                )));
            }

            let values = self
                .targets
                .iter()
                .cloned()
                .zip(predicted.iter().map(|&v| clip_non_negative(v)))
                .collect();
            records.push(ForecastRecord::new(quarter, values));
            debug!(group = %self.group, %quarter, "forecast step");

            // The unclipped prediction becomes the newest history row.
            window.advance(predicted)?;
            quarter = quarter.next();
        }

        Ok(records)
    }
}

/// Forecast one variable group for one station.
///
/// `schema` is the exact feature order the model was trained with.
pub fn forecast(
    history: &LagWindow,
    model: &dyn Regressor,
    schema: &FeatureSchema,
    group: VariableGroup,
    start: Quarter,
    n_quarters: usize,
) -> Result<Vec<ForecastRecord>> {
    RollingForecaster::new(model, schema, group)?.forecast(history, start, n_quarters)
}

/// Forecast the eight metals for one station
pub fn forecast_metal(
    history: &LagWindow,
    model: &TrainedModel,
    start: Quarter,
    n_quarters: usize,
) -> Result<Vec<ForecastRecord>> {
    RollingForecaster::from_trained(model, VariableGroup::Metal)?.forecast(
        history,
        start,
        n_quarters,
    )
}

/// Forecast the species-specific environmental variables for one station
pub fn forecast_non_metal(
    species: Species,
    history: &LagWindow,
    model: &TrainedModel,
    start: Quarter,
    n_quarters: usize,
) -> Result<Vec<ForecastRecord>> {
    RollingForecaster::from_trained(model, VariableGroup::NonMetal(species))?.forecast(
        history,
        start,
        n_quarters,
    )
}
