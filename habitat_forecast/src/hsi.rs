//! Habitat Suitability Index scoring
//!
//! The HSI of a forecast record is the arithmetic mean of the per-variable
//! rule scores for one species. Variables the record does not carry at all
//! are skipped; variables carried as `NaN` score `0.0`.

use crate::error::{ForecastError, Result};
use crate::forecast::ForecastRecord;
use crate::quarter::Quarter;
use crate::species::Species;
use habitat_math::{Position, ScoreRule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Ordered suitability levels, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HsiLevel {
    #[serde(rename = "Unsuitable")]
    Unsuitable,
    #[serde(rename = "Marginally suitable")]
    MarginallySuitable,
    #[serde(rename = "Suitable")]
    Suitable,
    #[serde(rename = "Very suitable")]
    VerySuitable,
}

impl HsiLevel {
    pub const ALL: [HsiLevel; 4] = [
        HsiLevel::VerySuitable,
        HsiLevel::Suitable,
        HsiLevel::MarginallySuitable,
        HsiLevel::Unsuitable,
    ];

    /// Band of an HSI value; each band includes its lower bound
    pub fn from_score(hsi: f64) -> Self {
        if hsi >= 0.85 {
            HsiLevel::VerySuitable
        } else if hsi >= 0.75 {
            HsiLevel::Suitable
        } else if hsi >= 0.5 {
            HsiLevel::MarginallySuitable
        } else {
            HsiLevel::Unsuitable
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HsiLevel::VerySuitable => "Very suitable",
            HsiLevel::Suitable => "Suitable",
            HsiLevel::MarginallySuitable => "Marginally suitable",
            HsiLevel::Unsuitable => "Unsuitable",
        }
    }
}

impl fmt::Display for HsiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rule table of one species, keyed by variable name
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeciesRules {
    rules: BTreeMap<String, ScoreRule>,
}

impl SpeciesRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the rule of a variable
    pub fn with_rule(mut self, variable: impl Into<String>, rule: ScoreRule) -> Self {
        self.rules.insert(variable.into(), rule);
        self
    }

    pub fn get(&self, variable: &str) -> Option<&ScoreRule> {
        self.rules.get(variable)
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn validate(&self, species: Species) -> Result<()> {
        if self.rules.is_empty() {
            return Err(ForecastError::InvalidRule(format!(
                "No rules configured for {}",
                species
            )));
        }
        for (variable, rule) in &self.rules {
            rule.validate().map_err(|err| {
                ForecastError::InvalidRule(format!("{} {}: {}", species, variable, err))
            })?;
        }
        Ok(())
    }

    /// HSI of a set of variable values.
    ///
    /// Returns `0.0` when no ruled variable is present.
    pub fn score_values(&self, values: &BTreeMap<String, f64>) -> f64 {
        let scores: Vec<f64> = self
            .rules
            .iter()
            .filter_map(|(variable, rule)| values.get(variable).map(|&v| rule.score(v)))
            .collect();

        if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        }
    }
}

fn range(low: f64, high: f64) -> ScoreRule {
    ScoreRule::RangeOptimal { low, high }
}

fn upper(max_val: f64) -> ScoreRule {
    ScoreRule::UpperBound { max_val }
}

fn lower(min_val: f64) -> ScoreRule {
    ScoreRule::LowerBound { min_val }
}

/// Metal limits shared by both species
const METAL_LIMITS: [(&str, f64); 8] = [
    ("CN", 0.1),
    ("As", 0.02),
    ("Cd", 0.005),
    ("Pb", 0.05),
    ("Cu", 0.2),
    ("Hg", 0.001),
    ("Zn", 0.5),
    ("Total_Cr", 0.1),
];

fn with_metal_limits(rules: SpeciesRules) -> SpeciesRules {
    METAL_LIMITS
        .iter()
        .fold(rules, |rules, (metal, limit)| rules.with_rule(*metal, upper(*limit)))
}

fn default_oyster_rules() -> SpeciesRules {
    with_metal_limits(
        SpeciesRules::new()
            .with_rule("DO", lower(5.0))
            .with_rule("Temperature", range(20.0, 28.0))
            .with_rule("pH", range(7.5, 8.0))
            .with_rule("Salinity", range(20.0, 25.0))
            .with_rule("Alkalinity", range(60.0, 180.0))
            .with_rule("Transparency", range(20.0, 50.0))
            .with_rule("NH3", upper(0.3))
            .with_rule("H2S", upper(0.05))
            .with_rule("BOD5", upper(50.0))
            .with_rule("COD", upper(150.0))
            .with_rule("Coliform", upper(5000.0))
            .with_rule("TSS", upper(50.0)),
    )
}

fn default_cobia_rules() -> SpeciesRules {
    with_metal_limits(
        SpeciesRules::new()
            .with_rule("DO", lower(6.0))
            .with_rule("Temperature", range(24.0, 28.0))
            .with_rule("pH", range(8.0, 8.5))
            .with_rule("Salinity", range(27.0, 33.0))
            .with_rule("Alkalinity", range(60.0, 180.0))
            .with_rule("Transparency", range(20.0, 50.0))
            .with_rule("NH3", upper(0.1))
            .with_rule("PO4", upper(0.2))
            .with_rule("BOD5", upper(50.0))
            .with_rule("COD", upper(150.0))
            .with_rule("Coliform", upper(5000.0))
            .with_rule("TSS", upper(50.0)),
    )
}

/// Species-keyed rule tables
///
/// JSON form: `{"oyster": {"DO": {"min_val": 5}, "pH": {"low": 7.5, "high": 8.0}}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleBook {
    species: BTreeMap<Species, SpeciesRules>,
}

impl Default for RuleBook {
    fn default() -> Self {
        let species = BTreeMap::from([
            (Species::Oyster, default_oyster_rules()),
            (Species::Cobia, default_cobia_rules()),
        ]);
        Self { species }
    }
}

impl RuleBook {
    /// Build a validated rule book
    pub fn new(species: BTreeMap<Species, SpeciesRules>) -> Result<Self> {
        let book = Self { species };
        book.validate()?;
        Ok(book)
    }

    /// Load and validate a rule book from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let book: RuleBook = serde_json::from_str(&fs::read_to_string(path)?)?;
        book.validate()?;
        debug!(path = %path.display(), species = book.species.len(), "loaded rule book");
        Ok(book)
    }

    /// Reject empty tables and bounds that would divide by zero
    pub fn validate(&self) -> Result<()> {
        self.species
            .iter()
            .try_for_each(|(species, rules)| rules.validate(*species))
    }

    /// Rules of one species
    pub fn rules(&self, species: Species) -> Result<&SpeciesRules> {
        self.species.get(&species).ok_or_else(|| {
            ForecastError::InvalidRule(format!("No rules configured for {}", species))
        })
    }

    /// Score one forecast record
    pub fn score(&self, record: &ForecastRecord, species: Species) -> Result<HsiRecord> {
        let rules = self.rules(species)?;
        Ok(HsiRecord::new(record.clone(), rules.score_values(&record.values)))
    }

    /// Score a sequence of forecast records
    pub fn score_all(&self, records: &[ForecastRecord], species: Species) -> Result<Vec<HsiRecord>> {
        let rules = self.rules(species)?;
        Ok(records
            .iter()
            .map(|record| HsiRecord::new(record.clone(), rules.score_values(&record.values)))
            .collect())
    }
}

/// A forecast record with its suitability score
#[derive(Debug, Clone, PartialEq)]
pub struct HsiRecord {
    pub forecast: ForecastRecord,
    pub hsi: f64,
    pub level: HsiLevel,
}

impl HsiRecord {
    fn new(forecast: ForecastRecord, hsi: f64) -> Self {
        Self {
            forecast,
            hsi,
            level: HsiLevel::from_score(hsi),
        }
    }

    pub fn quarter(&self) -> Quarter {
        self.forecast.quarter
    }
}

/// One row of the per-station, per-quarter HSI table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HsiTableRow {
    pub station: String,
    pub x: f64,
    pub y: f64,
    pub year: i32,
    pub quarter: u8,
    pub hsi: f64,
    #[serde(default)]
    pub level: Option<HsiLevel>,
}

impl HsiTableRow {
    pub fn from_record(station: &str, position: Position, record: &HsiRecord) -> Self {
        Self {
            station: station.to_string(),
            x: position.x,
            y: position.y,
            year: record.forecast.year(),
            quarter: record.forecast.quarter_number(),
            hsi: record.hsi,
            level: Some(record.level),
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn quarter(&self) -> Result<Quarter> {
        Quarter::new(self.year, self.quarter)
    }
}

/// Level distribution and HSI extremes of an HSI table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HsiSummary {
    pub total: usize,
    pub counts: BTreeMap<HsiLevel, usize>,
    pub min_hsi: Option<f64>,
    pub max_hsi: Option<f64>,
}

impl HsiSummary {
    pub fn from_rows(rows: &[HsiTableRow]) -> Self {
        let mut counts = BTreeMap::new();
        for row in rows {
            let level = row.level.unwrap_or_else(|| HsiLevel::from_score(row.hsi));
            *counts.entry(level).or_insert(0) += 1;
        }

        let finite = rows.iter().map(|row| row.hsi).filter(|h| h.is_finite());
        let min_hsi = finite.clone().reduce(f64::min);
        let max_hsi = finite.reduce(f64::max);

        Self {
            total: rows.len(),
            counts,
            min_hsi,
            max_hsi,
        }
    }

    pub fn count(&self, level: HsiLevel) -> usize {
        self.counts.get(&level).copied().unwrap_or(0)
    }

    /// Share of rows at `level`, in percent
    pub fn percentage(&self, level: HsiLevel) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.count(level) as f64 * 100.0 / self.total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn levels_include_lower_bounds() {
        assert_eq!(HsiLevel::from_score(0.9), HsiLevel::VerySuitable);
        assert_eq!(HsiLevel::from_score(0.85), HsiLevel::VerySuitable);
        assert_eq!(HsiLevel::from_score(0.8), HsiLevel::Suitable);
        assert_eq!(HsiLevel::from_score(0.75), HsiLevel::Suitable);
        assert_eq!(HsiLevel::from_score(0.6), HsiLevel::MarginallySuitable);
        assert_eq!(HsiLevel::from_score(0.5), HsiLevel::MarginallySuitable);
        assert_eq!(HsiLevel::from_score(0.3), HsiLevel::Unsuitable);
    }

    #[test]
    fn absent_variables_are_skipped_and_nan_scores_zero() {
        let rules = RuleBook::default();
        let oyster = rules.rules(Species::Oyster).unwrap();

        assert_eq!(oyster.score_values(&values(&[("DO", 6.0)])), 1.0);
        assert_eq!(oyster.score_values(&values(&[("DO", 6.0), ("pH", f64::NAN)])), 0.5);
        assert_eq!(oyster.score_values(&values(&[("Unruled", 1.0)])), 0.0);
    }

    #[test]
    fn default_tables_differ_by_species() {
        let rules = RuleBook::default();
        let oyster = rules.rules(Species::Oyster).unwrap();
        let cobia = rules.rules(Species::Cobia).unwrap();

        assert_eq!(oyster.len(), 20);
        assert_eq!(cobia.len(), 20);
        assert!(oyster.get("H2S").is_some());
        assert!(cobia.get("H2S").is_none());
        assert_eq!(cobia.get("PO4"), Some(&ScoreRule::UpperBound { max_val: 0.2 }));
        assert!(rules.validate().is_ok());
    }

    #[test]
    fn zero_bounds_are_configuration_errors() {
        let bad = SpeciesRules::new().with_rule("DO", lower(0.0));
        let err = RuleBook::new(BTreeMap::from([(Species::Oyster, bad)])).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidRule(_)));
    }

    #[test]
    fn rule_book_reads_json() {
        let json = r#"{"cobia": {"DO": {"min_val": 6}, "Temperature": {"low": 24, "high": 28}}}"#;
        let book: RuleBook = serde_json::from_str(json).unwrap();
        book.validate().unwrap();

        let cobia = book.rules(Species::Cobia).unwrap();
        assert_eq!(cobia.get("Temperature"), Some(&range(24.0, 28.0)));
        assert!(book.rules(Species::Oyster).is_err());
    }

    #[test]
    fn summary_counts_levels() {
        let row = |hsi: f64| HsiTableRow {
            station: "S".to_string(),
            x: 0.0,
            y: 0.0,
            year: 2026,
            quarter: 1,
            hsi,
            level: Some(HsiLevel::from_score(hsi)),
        };
        let summary = HsiSummary::from_rows(&[row(0.9), row(0.2), row(0.3), row(0.6)]);

        assert_eq!(summary.count(HsiLevel::Unsuitable), 2);
        assert_eq!(summary.percentage(HsiLevel::VerySuitable), 25.0);
        assert_eq!(summary.min_hsi, Some(0.2));
        assert_eq!(summary.max_hsi, Some(0.9));
    }
}
