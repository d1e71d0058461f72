//! Historical station data for forecasting

use crate::error::{ForecastError, Result};
use crate::quarter::Quarter;
use habitat_math::Position;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

/// Number of historical quarters needed to build lag1/lag4 features
pub const LAG_WINDOW: usize = 4;

/// Canonical column names and the source headers they may appear under.
///
/// Matching is exact and tried in order, so the table is the single place
/// that decides which spreadsheet header feeds which canonical column.
pub const COLUMN_ALIASES: &[(&str, &[&str])] = &[
    ("station", &["station", "Station", "maHieu", "MaHieu"]),
    ("quarter", &["quarter", "Quarter"]),
    ("x", &["x", "X"]),
    ("y", &["y", "Y"]),
];

/// Resolve a canonical column name against the headers of a table
pub fn resolve_column<'a>(headers: &[&'a str], canonical: &str) -> Option<&'a str> {
    let aliases = COLUMN_ALIASES
        .iter()
        .find(|(name, _)| *name == canonical)
        .map(|(_, aliases)| *aliases)?;

    aliases
        .iter()
        .find_map(|alias| headers.iter().find(|h| *h == alias).copied())
}

/// A monitoring station and its projected position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationInfo {
    pub station: String,
    pub position: Position,
}

impl StationInfo {
    pub fn new(station: impl Into<String>, position: Position) -> Self {
        Self {
            station: station.into(),
            position,
        }
    }
}

/// How a station is located in the historical table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationMatch {
    /// Match the station identifier column
    Id,
    /// Match the exact `(x, y)` coordinates
    #[default]
    Position,
}

/// The most recent four quarters of a set of variables at one station
///
/// Rows are ordered oldest first. The window is the basis of the lag
/// features: `lag1` reads the newest row and `lag4` the oldest.
#[derive(Debug, Clone, PartialEq)]
pub struct LagWindow {
    variables: Vec<String>,
    rows: VecDeque<Vec<f64>>,
}

impl LagWindow {
    /// Build a window from chronologically ordered rows.
    ///
    /// Only the last four rows are kept. Fewer than four rows is an
    /// `InsufficientHistory` error; the window is never padded.
    pub fn new(station: &str, variables: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if rows.len() < LAG_WINDOW {
            return Err(ForecastError::InsufficientHistory {
                station: station.to_string(),
                available: rows.len(),
            });
        }
        if let Some(bad) = rows.iter().find(|row| row.len() != variables.len()) {
            return Err(ForecastError::DataError(format!(
                "History row has {} values but {} variables were requested",
                bad.len(),
                variables.len()
            )));
        }

        let skip = rows.len() - LAG_WINDOW;
        Ok(Self {
            variables,
            rows: rows.into_iter().skip(skip).collect(),
        })
    }

    /// Build a window from per-variable series, each ordered oldest first
    pub fn from_columns(station: &str, columns: &[(&str, Vec<f64>)]) -> Result<Self> {
        let len = columns.first().map(|(_, values)| values.len()).unwrap_or(0);
        if columns.iter().any(|(_, values)| values.len() != len) {
            return Err(ForecastError::DataError(
                "All history columns must have the same length".to_string(),
            ));
        }

        let variables = columns.iter().map(|(name, _)| name.to_string()).collect();
        let rows = (0..len)
            .map(|i| columns.iter().map(|(_, values)| values[i]).collect())
            .collect();

        Self::new(station, variables, rows)
    }

    /// Variable names, in the order of every row
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Value of variable `index` one quarter back
    pub fn lag1(&self, index: usize) -> f64 {
        self.rows[LAG_WINDOW - 1][index]
    }

    /// Value of variable `index` four quarters back
    pub fn lag4(&self, index: usize) -> f64 {
        self.rows[0][index]
    }

    /// Drop the oldest row and append `values` as the newest
    pub fn advance(&mut self, values: Vec<f64>) -> Result<()> {
        if values.len() != self.variables.len() {
            return Err(ForecastError::ModelError(format!(
                "Prediction has {} values but the window tracks {} variables",
                values.len(),
                self.variables.len()
            )));
        }
        self.rows.pop_front();
        self.rows.push_back(values);
        Ok(())
    }

    /// Rows, oldest first
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.rows.iter().map(|row| row.as_slice())
    }
}

/// Historical water-quality table for all stations
#[derive(Debug, Clone)]
pub struct HistoryTable {
    /// Data frame holding the raw variable columns
    df: DataFrame,
    /// Station identifier per row
    stations: Vec<Option<String>>,
    /// Parsed quarter per row (`None` when unparsable)
    quarters: Vec<Option<Quarter>>,
    /// Projected position per row (`NaN` when missing)
    positions: Vec<Position>,
}

/// Data loader for historical station data
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load the cleaned historical table from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<HistoryTable> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        debug!(path = %path.display(), rows = df.height(), "loaded history csv");
        HistoryTable::from_dataframe(df)
    }

    /// Create a history table from an existing DataFrame
    pub fn from_dataframe(df: DataFrame) -> Result<HistoryTable> {
        HistoryTable::from_dataframe(df)
    }

    /// Load a station coordinate table (`station`/`maHieu`, `X`, `Y`)
    pub fn stations_from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<StationInfo>> {
        let file = File::open(path.as_ref())?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        let stations = string_column(&df, required_column(&df, "station")?)?;
        let xs = numeric_column(&df, required_column(&df, "x")?)?;
        let ys = numeric_column(&df, required_column(&df, "y")?)?;

        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for ((station, x), y) in stations.into_iter().zip(xs).zip(ys) {
            let Some(station) = station else {
                warn!("skipping coordinate row without station id");
                continue;
            };
            if seen.insert(station.clone()) {
                result.push(StationInfo::new(station, Position::new(x, y)));
            }
        }
        Ok(result)
    }
}

impl HistoryTable {
    /// Resolve canonical columns and parse quarters
    pub fn from_dataframe(df: DataFrame) -> Result<Self> {
        let stations = string_column(&df, required_column(&df, "station")?)?;
        let quarter_labels = string_column(&df, required_column(&df, "quarter")?)?;
        let xs = numeric_column(&df, required_column(&df, "x")?)?;
        let ys = numeric_column(&df, required_column(&df, "y")?)?;

        let mut dropped = 0usize;
        let quarters = quarter_labels
            .iter()
            .map(|label| {
                let parsed = label.as_deref().and_then(|l| l.parse::<Quarter>().ok());
                if parsed.is_none() {
                    dropped += 1;
                }
                parsed
            })
            .collect();
        if dropped > 0 {
            warn!(dropped, "history rows with unparsable quarter are ignored");
        }

        let positions = xs
            .into_iter()
            .zip(ys)
            .map(|(x, y)| Position::new(x, y))
            .collect();

        Ok(Self {
            df,
            stations,
            quarters,
            positions,
        })
    }

    /// Get the DataFrame
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.df.height()
    }

    /// Check if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Unique stations in order of first appearance, with their first position
    pub fn stations(&self) -> Vec<StationInfo> {
        let mut seen = HashSet::new();
        self.stations
            .iter()
            .zip(&self.positions)
            .filter_map(|(station, position)| {
                let station = station.as_ref()?;
                seen.insert(station.clone())
                    .then(|| StationInfo::new(station.clone(), *position))
            })
            .collect()
    }

    /// Station whose coordinates match `position` exactly
    pub fn station_at(&self, position: Position) -> Option<&str> {
        self.stations
            .iter()
            .zip(&self.positions)
            .find(|(_, p)| **p == position)
            .and_then(|(station, _)| station.as_deref())
    }

    /// Lag window for a station located by identifier or position
    pub fn window_for(
        &self,
        station: &StationInfo,
        matching: StationMatch,
        variables: &[String],
    ) -> Result<LagWindow> {
        let rows: Vec<usize> = match matching {
            StationMatch::Id => (0..self.len())
                .filter(|&i| self.stations[i].as_deref() == Some(station.station.as_str()))
                .collect(),
            StationMatch::Position => (0..self.len())
                .filter(|&i| self.positions[i] == station.position)
                .collect(),
        };
        self.window_from_rows(&station.station, rows, variables)
    }

    /// Lag window for a station identifier
    pub fn window(&self, station: &str, variables: &[String]) -> Result<LagWindow> {
        let rows = (0..self.len())
            .filter(|&i| self.stations[i].as_deref() == Some(station))
            .collect();
        self.window_from_rows(station, rows, variables)
    }

    fn window_from_rows(
        &self,
        station: &str,
        rows: Vec<usize>,
        variables: &[String],
    ) -> Result<LagWindow> {
        if rows.is_empty() {
            return Err(ForecastError::StationNotFound(station.to_string()));
        }

        let mut dated: Vec<(Quarter, usize)> = rows
            .into_iter()
            .filter_map(|i| self.quarters[i].map(|q| (q, i)))
            .collect();
        dated.sort_by_key(|(quarter, _)| *quarter);

        if dated.len() < LAG_WINDOW {
            return Err(ForecastError::InsufficientHistory {
                station: station.to_string(),
                available: dated.len(),
            });
        }
        let recent = &dated[dated.len() - LAG_WINDOW..];

        let columns = variables
            .iter()
            .map(|name| numeric_column(&self.df, name))
            .collect::<Result<Vec<_>>>()?;

        let window_rows = recent
            .iter()
            .map(|(_, i)| columns.iter().map(|column| column[*i]).collect())
            .collect();

        debug!(station, first = %recent[0].0, last = %recent[LAG_WINDOW - 1].0, "built lag window");
        LagWindow::new(station, variables.to_vec(), window_rows)
    }
}

fn required_column<'a>(df: &'a DataFrame, canonical: &str) -> Result<&'a str> {
    let headers = df.get_column_names();
    resolve_column(&headers, canonical).ok_or_else(|| {
        ForecastError::DataError(format!(
            "No {} column found in data (columns: {:?})",
            canonical, headers
        ))
    })
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(name)?.cast(&DataType::Utf8)?;
    let values = series
        .utf8()?
        .into_iter()
        .map(|v| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
        .collect();
    Ok(values)
}

/// Numeric view of a column; unparsable and empty cells become `NaN`
fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df.column(name).map_err(|_| {
        ForecastError::DataError(format!("Column {} is missing from the history table", name))
    })?;
    let series = column.cast(&DataType::Float64)?;
    let values = series
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();
    Ok(values)
}
