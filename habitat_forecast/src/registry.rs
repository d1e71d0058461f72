//! Loaded model artifacts for every variable group

use crate::config::{ModelConfig, ModelSource};
use crate::error::{ForecastError, Result};
use crate::forecast::{FeaturePlan, VariableGroup};
use crate::models::TrainedModel;
use crate::species::Species;
use std::collections::BTreeMap;
use tracing::info;

/// The metal model and the per-species non-metal models.
///
/// Models are read-only once loaded and shared by all forecasting workers.
#[derive(Debug)]
pub struct ModelRegistry {
    metal: TrainedModel,
    species: BTreeMap<Species, TrainedModel>,
}

impl ModelRegistry {
    /// Build a registry, checking every model's features against its group
    pub fn new(metal: TrainedModel, species: BTreeMap<Species, TrainedModel>) -> Result<Self> {
        FeaturePlan::compile(metal.schema(), VariableGroup::Metal)?;
        for (species, model) in &species {
            FeaturePlan::compile(model.schema(), VariableGroup::NonMetal(*species))?;
        }
        Ok(Self { metal, species })
    }

    /// Load every configured artifact
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let load = |source: &ModelSource| {
            TrainedModel::load(&source.model, source.features.as_deref())
        };

        let metal = load(&config.metal)?;
        let species = config
            .species
            .iter()
            .map(|(species, source)| Ok((*species, load(source)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        let registry = Self::new(metal, species)?;
        info!(species = ?registry.species.keys().collect::<Vec<_>>(), "model registry loaded");
        Ok(registry)
    }

    pub fn metal(&self) -> &TrainedModel {
        &self.metal
    }

    /// Non-metal model of a species
    pub fn non_metal(&self, species: Species) -> Result<&TrainedModel> {
        self.species.get(&species).ok_or_else(|| {
            ForecastError::InvalidParameter(format!("No model configured for {}", species))
        })
    }

    /// Species with a loaded non-metal model
    pub fn species(&self) -> impl Iterator<Item = Species> + '_ {
        self.species.keys().copied()
    }
}
