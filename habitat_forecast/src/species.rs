//! Cultured species served by the pipeline

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Species discriminator selecting the non-metal model and the HSI rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Oyster,
    Cobia,
}

impl Species {
    pub const ALL: [Species; 2] = [Species::Oyster, Species::Cobia];

    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Oyster => "oyster",
            Species::Cobia => "cobia",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Species {
    type Err = ForecastError;

    /// Only the exact strings `"oyster"` and `"cobia"` are accepted
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "oyster" => Ok(Species::Oyster),
            "cobia" => Ok(Species::Cobia),
            other => Err(ForecastError::InvalidSpecies(other.to_string())),
        }
    }
}
