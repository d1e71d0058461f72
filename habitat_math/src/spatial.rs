//! Planar distances and fixed-width distance bins
//!
//! Station coordinates are projected metres (VN-2000 TM); distances are
//! reported in kilometres.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Projected station position in metres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Northing column of the source tables
    pub x: f64,
    /// Easting column of the source tables
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Euclidean distance between two projected positions, in kilometres
pub fn planar_distance_km(a: Position, b: Position) -> f64 {
    (a.x - b.x).hypot(a.y - b.y) / 1000.0
}

/// Right-closed distance bins `(k·w, (k+1)·w]` starting at zero
///
/// The bin edges are `0, w, 2w, ...` up to the first edge at or past
/// `max_dist_km`, so the search range `[0, max_dist_km]` is always covered.
/// A distance of exactly zero falls in no bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceBins {
    bin_km: f64,
    n_bins: usize,
}

impl DistanceBins {
    /// Create bins of width `bin_km` covering `[0, max_dist_km]`
    pub fn new(max_dist_km: f64, bin_km: f64) -> Result<Self> {
        if !max_dist_km.is_finite() || max_dist_km <= 0.0 {
            return Err(MathError::InvalidInput(format!(
                "max_dist_km must be positive, got {}",
                max_dist_km
            )));
        }
        if !bin_km.is_finite() || bin_km <= 0.0 {
            return Err(MathError::InvalidInput(format!(
                "bin_km must be positive, got {}",
                bin_km
            )));
        }

        let n_bins = ((max_dist_km / bin_km).ceil() as usize).max(1);
        Ok(Self { bin_km, n_bins })
    }

    /// Number of bins
    pub fn len(&self) -> usize {
        self.n_bins
    }

    /// Always false; at least one bin exists
    pub fn is_empty(&self) -> bool {
        self.n_bins == 0
    }

    /// Bin width in kilometres
    pub fn width(&self) -> f64 {
        self.bin_km
    }

    /// Index of the bin containing `dist_km`, if any
    pub fn index_of(&self, dist_km: f64) -> Option<usize> {
        if dist_km.is_nan() || dist_km <= 0.0 {
            return None;
        }
        let upper_edge = (dist_km / self.bin_km).ceil() as usize;
        let index = upper_edge.checked_sub(1)?;
        (index < self.n_bins).then_some(index)
    }

    /// Midpoint of bin `index` in kilometres
    pub fn midpoint(&self, index: usize) -> f64 {
        (index as f64 + 0.5) * self.bin_km
    }
}
