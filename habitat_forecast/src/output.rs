//! CSV tables consumed by the presentation layer

use crate::error::{ForecastError, Result};
use crate::hsi::{HsiRecord, HsiTableRow};
use crate::radius::RadiusRecord;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// Columns an HSI table must provide
pub const HSI_REQUIRED_COLUMNS: [&str; 6] = ["station", "x", "y", "year", "quarter", "hsi"];

fn write_rows<T: Serialize, P: AsRef<Path>>(path: P, rows: &[T]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    debug!(path = %path.display(), rows = rows.len(), "wrote table");
    Ok(())
}

/// Write `station, x, y, year, quarter, hsi, level`
pub fn write_hsi_table<P: AsRef<Path>>(path: P, rows: &[HsiTableRow]) -> Result<()> {
    write_rows(path, rows)
}

/// Write `station, x, y, year, quarter, R_km, lat, lon`; an undefined radius is an empty cell
pub fn write_radius_table<P: AsRef<Path>>(path: P, records: &[RadiusRecord]) -> Result<()> {
    write_rows(path, records)
}

/// Read an HSI table, ignoring columns it does not need
pub fn read_hsi_table<P: AsRef<Path>>(path: P) -> Result<Vec<HsiTableRow>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    let missing: Vec<&str> = HSI_REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        return Err(ForecastError::DataError(format!(
            "{} is missing HSI table columns {:?}",
            path.display(),
            missing
        )));
    }

    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<HsiTableRow>, _>>()?;
    debug!(path = %path.display(), rows = rows.len(), "read hsi table");
    Ok(rows)
}

/// Write the full forecast of one station: every variable plus HSI and level
pub fn write_forecast_detail<P: AsRef<Path>>(
    path: P,
    station: &str,
    records: &[HsiRecord],
) -> Result<()> {
    let variables: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.forecast.values.keys().map(String::as_str))
        .collect();

    let mut writer = csv::Writer::from_path(path.as_ref())?;
    let mut header = vec!["station", "year", "quarter"];
    header.extend(variables.iter().copied());
    header.extend(["HSI", "HSI_Level"]);
    writer.write_record(&header)?;

    for record in records {
        let mut row = vec![
            station.to_string(),
            record.forecast.year().to_string(),
            record.forecast.quarter_number().to_string(),
        ];
        row.extend(variables.iter().map(|v| {
            record
                .forecast
                .get(v)
                .map(|value| value.to_string())
                .unwrap_or_default()
        }));
        row.push(record.hsi.to_string());
        row.push(record.level.to_string());
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}
