//! Fitted regressors consumed by the rolling forecaster
//!
//! A model artifact is a JSON file holding a fitted multi-output regressor.
//! Its feature schema (the exact training-time input order and the output
//! targets) lives next to it as `<stem>_features.json`.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod boosted_trees;
pub mod linear;

pub use boosted_trees::{BoostedTreesRegressor, RegressionTree, TreeEnsemble, TreeNode};
pub use linear::LinearRegressor;

/// A fitted multi-output regressor
///
/// `predict` takes one feature row, ordered as the model was trained, and
/// returns one value per target in training order.
pub trait Regressor: Debug + Send + Sync {
    /// Predict all targets for a single feature row
    fn predict(&self, features: &[f64]) -> Result<Vec<f64>>;

    /// Number of input features expected
    fn n_features(&self) -> usize;

    /// Number of targets produced
    fn n_outputs(&self) -> usize;
}

/// Training-time feature order and output targets of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// Schema format version
    #[serde(default = "FeatureSchema::current_version")]
    pub version: u32,
    /// Input feature names, in the order the model consumes them
    pub input_features: Vec<String>,
    /// Output target names, in the order the model produces them
    pub targets: Vec<String>,
}

impl FeatureSchema {
    pub const VERSION: u32 = 1;

    fn current_version() -> u32 {
        Self::VERSION
    }

    pub fn new(input_features: Vec<String>, targets: Vec<String>) -> Self {
        Self {
            version: Self::VERSION,
            input_features,
            targets,
        }
    }

    /// Read a schema from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ForecastError::MissingModelArtifact(path.to_path_buf()));
        }
        let schema: FeatureSchema = serde_json::from_str(&fs::read_to_string(path)?)?;
        if schema.version != Self::VERSION {
            return Err(ForecastError::FeatureMismatch(format!(
                "Unsupported feature schema version {} in {}",
                schema.version,
                path.display()
            )));
        }
        Ok(schema)
    }

    /// Sidecar schema path for a model file: `<dir>/<stem>_features.json`
    pub fn sidecar_path(model_path: &Path) -> PathBuf {
        let stem = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        model_path.with_file_name(format!("{}_features.json", stem))
    }
}

/// Serialized model families
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Linear(LinearRegressor),
    BoostedTrees(BoostedTreesRegressor),
}

impl ModelArtifact {
    /// Read and validate a model artifact from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ForecastError::MissingModelArtifact(path.to_path_buf()));
        }
        let artifact: ModelArtifact = serde_json::from_str(&fs::read_to_string(path)?)?;
        artifact.validate()?;
        Ok(artifact)
    }

    fn validate(&self) -> Result<()> {
        match self {
            ModelArtifact::Linear(model) => model.validate(),
            ModelArtifact::BoostedTrees(model) => model.validate(),
        }
    }
}

impl Regressor for ModelArtifact {
    fn predict(&self, features: &[f64]) -> Result<Vec<f64>> {
        match self {
            ModelArtifact::Linear(model) => model.predict(features),
            ModelArtifact::BoostedTrees(model) => model.predict(features),
        }
    }

    fn n_features(&self) -> usize {
        match self {
            ModelArtifact::Linear(model) => model.n_features(),
            ModelArtifact::BoostedTrees(model) => model.n_features(),
        }
    }

    fn n_outputs(&self) -> usize {
        match self {
            ModelArtifact::Linear(model) => model.n_outputs(),
            ModelArtifact::BoostedTrees(model) => model.n_outputs(),
        }
    }
}

/// A regressor paired with the feature schema it was trained with
#[derive(Debug)]
pub struct TrainedModel {
    regressor: Box<dyn Regressor>,
    schema: FeatureSchema,
}

impl TrainedModel {
    /// Pair a regressor with its schema, checking that their widths agree
    pub fn new(regressor: Box<dyn Regressor>, schema: FeatureSchema) -> Result<Self> {
        if regressor.n_features() != schema.input_features.len() {
            return Err(ForecastError::FeatureMismatch(format!(
                "Model expects {} features but the schema lists {}",
                regressor.n_features(),
                schema.input_features.len()
            )));
        }
        if regressor.n_outputs() != schema.targets.len() {
            return Err(ForecastError::FeatureMismatch(format!(
                "Model produces {} outputs but the schema lists {} targets",
                regressor.n_outputs(),
                schema.targets.len()
            )));
        }
        Ok(Self { regressor, schema })
    }

    /// Load a model and its schema.
    ///
    /// Without an explicit schema path the sidecar `<stem>_features.json`
    /// is used.
    pub fn load(model_path: &Path, schema_path: Option<&Path>) -> Result<Self> {
        let artifact = ModelArtifact::from_file(model_path)?;
        let schema_path = schema_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| FeatureSchema::sidecar_path(model_path));
        let schema = FeatureSchema::from_file(&schema_path)?;

        debug!(
            model = %model_path.display(),
            features = schema.input_features.len(),
            targets = schema.targets.len(),
            "loaded model artifact"
        );
        Self::new(Box::new(artifact), schema)
    }

    pub fn regressor(&self) -> &dyn Regressor {
        self.regressor.as_ref()
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }
}
