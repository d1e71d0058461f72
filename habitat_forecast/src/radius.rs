//! Spatial radius-of-validity estimation
//!
//! For one quarter, the divergence `|HSI_station - HSI_neighbour|` is
//! averaged over fixed-width distance bins. The radius is the midpoint of the
//! nearest bin whose mean divergence reaches `0.2 x` the sample standard
//! deviation of HSI across the whole snapshot. Quarters are independent.

use crate::error::Result;
use crate::geo::vn2000_to_wgs84;
use crate::hsi::HsiTableRow;
use crate::quarter::Quarter;
use habitat_math::{planar_distance_km, DistanceBins, Position};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Share of the snapshot HSI standard deviation that counts as lost similarity
pub const SIMILARITY_LOSS_FACTOR: f64 = 0.2;

/// Search range and bin width, in kilometres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadiusParams {
    pub max_dist_km: f64,
    pub bin_km: f64,
}

impl Default for RadiusParams {
    fn default() -> Self {
        Self {
            max_dist_km: 20.0,
            bin_km: 1.0,
        }
    }
}

impl RadiusParams {
    pub fn new(max_dist_km: f64, bin_km: f64) -> Self {
        Self { max_dist_km, bin_km }
    }

    /// Wider search range used for whole-table batches
    pub fn batch() -> Self {
        Self::new(50.0, 1.0)
    }

    fn bins(&self) -> Result<DistanceBins> {
        Ok(DistanceBins::new(self.max_dist_km, self.bin_km)?)
    }
}

/// One station's HSI in a quarter snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub station: String,
    pub position: Position,
    pub hsi: f64,
}

impl SnapshotEntry {
    pub fn new(station: impl Into<String>, position: Position, hsi: f64) -> Self {
        Self {
            station: station.into(),
            position,
            hsi,
        }
    }
}

/// All stations' HSI for one quarter
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialSnapshot {
    quarter: Quarter,
    entries: Vec<SnapshotEntry>,
}

impl SpatialSnapshot {
    pub fn new(quarter: Quarter, entries: Vec<SnapshotEntry>) -> Self {
        Self { quarter, entries }
    }

    /// Split an HSI table into per-quarter snapshots, in quarter order
    pub fn from_rows(rows: &[HsiTableRow]) -> Result<Vec<SpatialSnapshot>> {
        let mut grouped: BTreeMap<Quarter, Vec<SnapshotEntry>> = BTreeMap::new();
        for row in rows {
            grouped
                .entry(row.quarter()?)
                .or_default()
                .push(SnapshotEntry::new(row.station.clone(), row.position(), row.hsi));
        }
        Ok(grouped
            .into_iter()
            .map(|(quarter, entries)| Self::new(quarter, entries))
            .collect())
    }

    pub fn quarter(&self) -> Quarter {
        self.quarter
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    /// First entry of each station, in order of appearance
    pub fn stations(&self) -> Vec<&SnapshotEntry> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|entry| seen.insert(entry.station.as_str()))
            .collect()
    }

    /// Divergence threshold; `NaN` when fewer than two finite HSI values exist
    pub fn threshold(&self) -> f64 {
        let finite: Vec<f64> = self
            .entries
            .iter()
            .map(|entry| entry.hsi)
            .filter(|hsi| hsi.is_finite())
            .collect();
        SIMILARITY_LOSS_FACTOR * finite.std_dev()
    }
}

/// Radius of validity of one station, in kilometres.
///
/// `Ok(None)` when the station is not in the snapshot, has no finite HSI,
/// or has no neighbour within `max_dist_km`. `max_dist_km` itself is returned
/// when no bin reaches the threshold.
pub fn estimate_radius(
    snapshot: &SpatialSnapshot,
    station: &str,
    params: RadiusParams,
) -> Result<Option<f64>> {
    let bins = params.bins()?;

    let Some(center) = snapshot.entries.iter().find(|e| e.station == station) else {
        return Ok(None);
    };
    if !center.hsi.is_finite() {
        return Ok(None);
    }

    let mut sums = vec![0.0; bins.len()];
    let mut counts = vec![0usize; bins.len()];
    let mut neighbours = 0usize;

    for other in &snapshot.entries {
        if other.station == station {
            continue;
        }
        let dist = planar_distance_km(center.position, other.position);
        if dist > params.max_dist_km {
            continue;
        }
        neighbours += 1;
        // Counted as a neighbour, but a missing HSI adds no divergence
        if !other.hsi.is_finite() {
            continue;
        }
        if let Some(bin) = bins.index_of(dist) {
            sums[bin] += (center.hsi - other.hsi).abs();
            counts[bin] += 1;
        }
    }

    if neighbours == 0 {
        return Ok(None);
    }

    let threshold = snapshot.threshold();
    let radius = (0..bins.len())
        .filter(|&bin| counts[bin] > 0)
        .find(|&bin| sums[bin] / counts[bin] as f64 >= threshold)
        .map(|bin| bins.midpoint(bin))
        .unwrap_or(params.max_dist_km);

    Ok(Some(radius))
}

/// Radius of one station in one quarter, with geographic coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadiusRecord {
    pub station: String,
    pub x: f64,
    pub y: f64,
    pub year: i32,
    pub quarter: u8,
    #[serde(rename = "R_km")]
    pub r_km: Option<f64>,
    pub lat: f64,
    pub lon: f64,
}

/// One record per station of a snapshot
pub fn estimate_snapshot(
    snapshot: &SpatialSnapshot,
    params: RadiusParams,
) -> Result<Vec<RadiusRecord>> {
    snapshot
        .stations()
        .into_iter()
        .map(|entry| {
            let r_km = estimate_radius(snapshot, &entry.station, params)?;
            let (lat, lon) = vn2000_to_wgs84(entry.position.x, entry.position.y);
            Ok(RadiusRecord {
                station: entry.station.clone(),
                x: entry.position.x,
                y: entry.position.y,
                year: snapshot.quarter.year(),
                quarter: snapshot.quarter.quarter(),
                r_km,
                lat,
                lon,
            })
        })
        .collect()
}

/// Radius table for a whole HSI table, quarters evaluated in parallel
pub fn estimate_table(rows: &[HsiTableRow], params: RadiusParams) -> Result<Vec<RadiusRecord>> {
    params.bins()?;
    let snapshots = SpatialSnapshot::from_rows(rows)?;

    let per_quarter = snapshots
        .par_iter()
        .map(|snapshot| {
            let records = estimate_snapshot(snapshot, params)?;
            debug!(quarter = %snapshot.quarter, stations = records.len(), "estimated radii");
            Ok(records)
        })
        .collect::<Result<Vec<_>>>()?;

    let records: Vec<RadiusRecord> = per_quarter.into_iter().flatten().collect();
    info!(
        quarters = snapshots.len(),
        records = records.len(),
        undefined = records.iter().filter(|r| r.r_km.is_none()).count(),
        "radius table complete"
    );
    Ok(records)
}
