//! Joining the metal and non-metal forecasts of one station

use crate::error::{ForecastError, Result};
use crate::forecast::ForecastRecord;
use crate::quarter::Quarter;
use std::collections::BTreeMap;
use tracing::debug;

fn index_by_quarter<'a>(
    records: &'a [ForecastRecord],
    side: &str,
) -> Result<BTreeMap<Quarter, &'a ForecastRecord>> {
    let mut index = BTreeMap::new();
    for record in records {
        if index.insert(record.quarter, record).is_some() {
            return Err(ForecastError::DataError(format!(
                "{} forecast contains quarter {} more than once",
                side, record.quarter
            )));
        }
    }
    Ok(index)
}

/// Inner join of two forecasts on `(year, quarter)`.
///
/// Both forecasts are expected to cover the same window. Any quarter present
/// on only one side is reported as `JoinMismatch` instead of being dropped.
/// Output rows follow the order of `non_metal`.
pub fn merge(
    non_metal: &[ForecastRecord],
    metal: &[ForecastRecord],
) -> Result<Vec<ForecastRecord>> {
    index_by_quarter(non_metal, "Non-metal")?;
    let metal_index = index_by_quarter(metal, "Metal")?;

    let matched = non_metal
        .iter()
        .filter(|record| metal_index.contains_key(&record.quarter))
        .count();
    if matched != non_metal.len() || matched != metal.len() {
        return Err(ForecastError::JoinMismatch {
            left: non_metal.len(),
            right: metal.len(),
            matched,
        });
    }

    let merged = non_metal
        .iter()
        .map(|left| {
            let right = metal_index[&left.quarter];
            let mut values = left.values.clone();
            for (name, value) in &right.values {
                if values.insert(name.clone(), *value).is_some() {
                    return Err(ForecastError::DataError(format!(
                        "Variable {} is forecast by both groups",
                        name
                    )));
                }
            }
            Ok(ForecastRecord::new(left.quarter, values))
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(rows = merged.len(), "merged forecasts");
    Ok(merged)
}
