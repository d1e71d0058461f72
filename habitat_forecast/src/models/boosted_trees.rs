//! Gradient-boosted regression tree ensembles
//!
//! Inference-only form of a multi-output boosted model: one ensemble per
//! target, each the sum of a base score and the leaf values reached in
//! every tree. Trees are evaluated in order, but each is independent of
//! the others at inference time.

use crate::error::{ForecastError, Result};
use crate::models::Regressor;
use serde::{Deserialize, Serialize};

/// Node of a regression tree, stored in a flat array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Samples with `x[feature] <= threshold` go left; `NaN` follows `default_left`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        #[serde(default = "default_left")]
        default_left: bool,
    },
    /// Terminal node
    Leaf { leaf: f64 },
}

fn default_left() -> bool {
    true
}

/// A single regression tree; node 0 is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTree")]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

#[derive(Deserialize)]
struct RawTree {
    nodes: Vec<TreeNode>,
}

impl TryFrom<RawTree> for RegressionTree {
    type Error = ForecastError;

    fn try_from(raw: RawTree) -> Result<Self> {
        Self::new(raw.nodes)
    }
}

impl RegressionTree {
    /// Build a tree whose children always sit after their parent, so
    /// traversal terminates inside the node array.
    pub fn new(nodes: Vec<TreeNode>) -> Result<Self> {
        if nodes.is_empty() {
            return Err(ForecastError::ModelError("Empty regression tree".to_string()));
        }
        for (index, node) in nodes.iter().enumerate() {
            if let TreeNode::Split { left, right, .. } = *node {
                for child in [left, right] {
                    if child <= index || child >= nodes.len() {
                        return Err(ForecastError::ModelError(format!(
                            "Node {} has invalid child index {}",
                            index, child
                        )));
                    }
                }
            }
        }
        Ok(Self { nodes })
    }

    fn check_features(&self, n_features: usize) -> Result<()> {
        for (index, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split { feature, .. } = *node {
                if feature >= n_features {
                    return Err(ForecastError::ModelError(format!(
                        "Node {} splits on feature {} but the model has {} features",
                        index, feature, n_features
                    )));
                }
            }
        }
        Ok(())
    }

    /// Leaf value reached by a single sample
    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes[index] {
                TreeNode::Leaf { leaf } => return leaf,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let value = features.get(feature).copied().unwrap_or(f64::NAN);
                    let go_left = if value.is_nan() {
                        default_left
                    } else {
                        value <= threshold
                    };
                    index = if go_left { left } else { right };
                }
            }
        }
    }
}

/// Boosted ensemble for one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    #[serde(default)]
    base_score: f64,
    trees: Vec<RegressionTree>,
}

impl TreeEnsemble {
    pub fn new(base_score: f64, trees: Vec<RegressionTree>) -> Self {
        Self { base_score, trees }
    }

    fn predict(&self, features: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.predict(features)).sum::<f64>()
    }
}

/// Multi-output boosted regressor, one ensemble per target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBoostedTrees")]
pub struct BoostedTreesRegressor {
    n_features: usize,
    targets: Vec<TreeEnsemble>,
}

#[derive(Deserialize)]
struct RawBoostedTrees {
    n_features: usize,
    targets: Vec<TreeEnsemble>,
}

impl TryFrom<RawBoostedTrees> for BoostedTreesRegressor {
    type Error = ForecastError;

    fn try_from(raw: RawBoostedTrees) -> Result<Self> {
        Self::new(raw.n_features, raw.targets)
    }
}

impl BoostedTreesRegressor {
    pub fn new(n_features: usize, targets: Vec<TreeEnsemble>) -> Result<Self> {
        let model = Self {
            n_features,
            targets,
        };
        model.validate()?;
        Ok(model)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(ForecastError::ModelError(
                "Boosted model has no targets".to_string(),
            ));
        }
        self.targets
            .iter()
            .flat_map(|ensemble| &ensemble.trees)
            .try_for_each(|tree| tree.check_features(self.n_features))
    }

    /// Number of trees across all targets
    pub fn n_trees(&self) -> usize {
        self.targets.iter().map(|e| e.trees.len()).sum()
    }
}

impl Regressor for BoostedTreesRegressor {
    fn predict(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.n_features {
            return Err(ForecastError::FeatureMismatch(format!(
                "Boosted model expects {} features, got {}",
                self.n_features,
                features.len()
            )));
        }
        Ok(self.targets.iter().map(|e| e.predict(features)).collect())
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_outputs(&self) -> usize {
        self.targets.len()
    }
}
