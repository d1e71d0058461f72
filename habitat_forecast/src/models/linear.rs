//! Multi-output linear regressor

use crate::error::{ForecastError, Result};
use crate::models::Regressor;
use serde::{Deserialize, Serialize};

/// One intercept and one coefficient row per target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegressor {
    intercepts: Vec<f64>,
    coefficients: Vec<Vec<f64>>,
}

impl LinearRegressor {
    /// Create a new linear regressor
    pub fn new(intercepts: Vec<f64>, coefficients: Vec<Vec<f64>>) -> Result<Self> {
        let model = Self {
            intercepts,
            coefficients,
        };
        model.validate()?;
        Ok(model)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.intercepts.is_empty() {
            return Err(ForecastError::ModelError(
                "Linear model has no targets".to_string(),
            ));
        }
        if self.intercepts.len() != self.coefficients.len() {
            return Err(ForecastError::ModelError(format!(
                "Linear model has {} intercepts but {} coefficient rows",
                self.intercepts.len(),
                self.coefficients.len()
            )));
        }
        let width = self.coefficients[0].len();
        if self.coefficients.iter().any(|row| row.len() != width) {
            return Err(ForecastError::ModelError(
                "Linear model coefficient rows differ in length".to_string(),
            ));
        }
        Ok(())
    }
}

impl Regressor for LinearRegressor {
    fn predict(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.n_features() {
            return Err(ForecastError::FeatureMismatch(format!(
                "Linear model expects {} features, got {}",
                self.n_features(),
                features.len()
            )));
        }

        Ok(self
            .intercepts
            .iter()
            .zip(&self.coefficients)
            .map(|(intercept, row)| {
                intercept + row.iter().zip(features).map(|(c, x)| c * x).sum::<f64>()
            })
            .collect())
    }

    fn n_features(&self) -> usize {
        self.coefficients.first().map(Vec::len).unwrap_or(0)
    }

    fn n_outputs(&self) -> usize {
        self.intercepts.len()
    }
}
