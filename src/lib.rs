//! # Coastal HSI Workspace
//!
//! Facade over the workspace crates:
//!
//! - [`habitat_math`]: suitability rule shapes, planar distances and distance bins
//! - [`habitat_forecast`]: history ingestion, rolling forecasts, HSI scoring,
//!   radius-of-validity estimation and batch runs
//!
//! ## Example
//!
//! ```
//! use coastal_hsi_workspace::forecast::{HsiLevel, RuleBook, Species};
//! use coastal_hsi_workspace::forecast::ForecastRecord;
//! use coastal_hsi_workspace::forecast::Quarter;
//!
//! let record = ForecastRecord::new(
//!     Quarter::new(2026, 1).unwrap(),
//!     [("DO".to_string(), 6.0), ("Temperature".to_string(), 24.0)].into(),
//! );
//! let scored = RuleBook::default().score(&record, Species::Cobia).unwrap();
//! assert_eq!(scored.hsi, 1.0);
//! assert_eq!(scored.level, HsiLevel::VerySuitable);
//! ```

pub use habitat_forecast as forecast;
pub use habitat_math as math;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crates_are_reachable_through_the_facade() {
        let a = math::Position::new(0.0, 0.0);
        let b = math::Position::new(3000.0, 4000.0);
        assert_eq!(math::planar_distance_km(a, b), 5.0);
        assert_eq!(forecast::Species::ALL.len(), 2);
    }
}
