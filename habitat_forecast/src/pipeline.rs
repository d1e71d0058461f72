//! Per-station forecasting and HSI scoring, and the batch fan-out across stations
//!
//! Stations are independent: each worker forecasts both variable groups,
//! merges them and scores the result. A failing station is recorded in the
//! batch report and does not stop the others.

use crate::config::PipelineConfig;
use crate::data::{DataLoader, HistoryTable, StationInfo, StationMatch};
use crate::error::{ForecastError, Result};
use crate::forecast::{forecast_metal, forecast_non_metal, ForecastRecord};
use crate::hsi::{HsiRecord, HsiSummary, HsiTableRow, RuleBook};
use crate::merge::merge;
use crate::quarter::Quarter;
use crate::registry::ModelRegistry;
use crate::species::Species;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, info, warn};

/// Default number of batch workers
pub const DEFAULT_WORKERS: usize = 4;

/// Named reason a station could not be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationFailure {
    pub kind: &'static str,
    pub message: String,
}

impl From<&ForecastError> for StationFailure {
    fn from(err: &ForecastError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result of one station in a batch run
#[derive(Debug, Clone)]
pub struct StationOutcome {
    pub station: StationInfo,
    pub result: std::result::Result<Vec<HsiRecord>, StationFailure>,
}

impl StationOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes of every station for one species, in station order
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub species: Species,
    pub outcomes: Vec<StationOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Failed stations with their reasons
    pub fn failures(&self) -> impl Iterator<Item = (&StationInfo, &StationFailure)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|f| (&o.station, f)))
    }

    /// HSI table built from the successful stations
    pub fn hsi_table(&self) -> Vec<HsiTableRow> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|records| (&o.station, records)))
            .flat_map(|(station, records)| {
                records
                    .iter()
                    .map(move |r| HsiTableRow::from_record(&station.station, station.position, r))
            })
            .collect()
    }

    pub fn summary(&self) -> HsiSummary {
        HsiSummary::from_rows(&self.hsi_table())
    }
}

/// History, models and rules wired together for forecasting runs
#[derive(Debug)]
pub struct Pipeline {
    history: HistoryTable,
    stations: Vec<StationInfo>,
    registry: ModelRegistry,
    rules: RuleBook,
    matching: StationMatch,
    workers: usize,
}

impl Pipeline {
    /// Create a pipeline over every station found in the history
    pub fn new(history: HistoryTable, registry: ModelRegistry, rules: RuleBook) -> Self {
        let stations = history.stations();
        Self {
            history,
            stations,
            registry,
            rules,
            matching: StationMatch::default(),
            workers: DEFAULT_WORKERS,
        }
    }

    /// Restrict or replace the station list
    pub fn with_stations(mut self, stations: Vec<StationInfo>) -> Self {
        self.stations = stations;
        self
    }

    pub fn with_station_match(mut self, matching: StationMatch) -> Self {
        self.matching = matching;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Load history, station list, models and rules named by a configuration
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;

        let history = DataLoader::from_csv(&config.history_csv)?;
        let registry = ModelRegistry::from_config(&config.models)?;
        let rules = match &config.rules {
            Some(path) => RuleBook::from_file(path)?,
            None => RuleBook::default(),
        };

        let mut pipeline = Self::new(history, registry, rules)
            .with_station_match(config.station_match)
            .with_workers(config.workers);
        if let Some(path) = &config.stations_csv {
            pipeline = pipeline.with_stations(DataLoader::stations_from_csv(path)?);
        }
        info!(
            rows = pipeline.history.len(),
            stations = pipeline.stations.len(),
            "pipeline ready"
        );
        Ok(pipeline)
    }

    pub fn stations(&self) -> &[StationInfo] {
        &self.stations
    }

    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }

    /// Merged metal and non-metal forecast of one station
    pub fn forecast_station(
        &self,
        station: &StationInfo,
        species: Species,
        start: Quarter,
        n_quarters: usize,
    ) -> Result<Vec<ForecastRecord>> {
        let metal_model = self.registry.metal();
        let species_model = self.registry.non_metal(species)?;

        let metal_history =
            self.history
                .window_for(station, self.matching, &metal_model.schema().targets)?;
        let species_history =
            self.history
                .window_for(station, self.matching, &species_model.schema().targets)?;

        let metal = forecast_metal(&metal_history, metal_model, start, n_quarters)?;
        let non_metal =
            forecast_non_metal(species, &species_history, species_model, start, n_quarters)?;

        debug!(station = %station.station, %species, quarters = n_quarters, "forecast station");
        merge(&non_metal, &metal)
    }

    /// Forecast and score one station
    pub fn hsi_for_station(
        &self,
        station: &StationInfo,
        species: Species,
        start: Quarter,
        n_quarters: usize,
    ) -> Result<Vec<HsiRecord>> {
        let forecast = self.forecast_station(station, species, start, n_quarters)?;
        self.rules.score_all(&forecast, species)
    }

    /// Forecast and score every station on a bounded worker pool.
    ///
    /// Fails only when the run itself is misconfigured; per-station errors
    /// are reported in the returned outcomes.
    pub fn run_species(
        &self,
        species: Species,
        start: Quarter,
        n_quarters: usize,
    ) -> Result<BatchReport> {
        if n_quarters == 0 {
            return Err(ForecastError::InvalidParameter(
                "n_quarters must be at least 1".to_string(),
            ));
        }
        self.registry.non_metal(species)?;
        self.rules.rules(species)?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|err| {
                ForecastError::InvalidParameter(format!("Cannot start worker pool: {}", err))
            })?;

        let outcomes: Vec<StationOutcome> = pool.install(|| {
            self.stations
                .par_iter()
                .map(|station| {
                    let result = self
                        .hsi_for_station(station, species, start, n_quarters)
                        .map_err(|err| {
                            warn!(station = %station.station, %species, kind = err.kind(), "{}", err);
                            StationFailure::from(&err)
                        });
                    StationOutcome {
                        station: station.clone(),
                        result,
                    }
                })
                .collect()
        });

        let report = BatchReport { species, outcomes };
        info!(
            %species,
            %start,
            stations = report.outcomes.len(),
            succeeded = report.succeeded(),
            "batch complete"
        );
        Ok(report)
    }
}
