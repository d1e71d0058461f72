//! Per-variable suitability rule shapes
//!
//! Each monitored variable is scored against exactly one rule:
//! - range-optimal `{low, high}`
//! - upper-bound-only `{max_val}` (less is better)
//! - lower-bound-only `{min_val}` (more is better, saturating)
//!
//! Scores are always in `[0, 1]`. A missing measurement (`NaN`) scores `0.0`.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Suitability rule for a single variable
///
/// Serialized untagged, so rule tables read naturally as
/// `{"low": 20, "high": 28}`, `{"max_val": 0.3}` or `{"min_val": 5}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreRule {
    /// Fully suitable inside `[low, high]`
    RangeOptimal { low: f64, high: f64 },
    /// Linear decay from 1 at zero to 0 at `max_val`
    UpperBound { max_val: f64 },
    /// Linear ramp from 0 at zero to 1 at `min_val`
    LowerBound { min_val: f64 },
}

impl ScoreRule {
    /// Create a range-optimal rule
    pub fn range(low: f64, high: f64) -> Result<Self> {
        let rule = Self::RangeOptimal { low, high };
        rule.validate()?;
        Ok(rule)
    }

    /// Create an upper-bound-only rule
    pub fn upper(max_val: f64) -> Result<Self> {
        let rule = Self::UpperBound { max_val };
        rule.validate()?;
        Ok(rule)
    }

    /// Create a lower-bound-only rule
    pub fn lower(min_val: f64) -> Result<Self> {
        let rule = Self::LowerBound { min_val };
        rule.validate()?;
        Ok(rule)
    }

    /// Check that every bound is finite and strictly positive.
    ///
    /// Every bound appears as a divisor in [`ScoreRule::score`], so a zero
    /// bound is rejected here rather than at scoring time.
    pub fn validate(&self) -> Result<()> {
        match *self {
            ScoreRule::RangeOptimal { low, high } => {
                check_bound("low", low)?;
                check_bound("high", high)?;
                if low > high {
                    return Err(MathError::InvalidBound(format!(
                        "low ({}) must not exceed high ({})",
                        low, high
                    )));
                }
                Ok(())
            }
            ScoreRule::UpperBound { max_val } => check_bound("max_val", max_val),
            ScoreRule::LowerBound { min_val } => check_bound("min_val", min_val),
        }
    }

    /// Score a single measurement.
    ///
    /// Above `high` the range rule ramps down as `(2·high − value)/high`,
    /// reaching zero at `2·high` and clamped there.
    pub fn score(&self, value: f64) -> f64 {
        if value.is_nan() {
            return 0.0;
        }

        match *self {
            ScoreRule::RangeOptimal { low, high } => {
                if value < low {
                    (value / low).max(0.0)
                } else if value > high {
                    ((2.0 * high - value) / high).max(0.0)
                } else {
                    1.0
                }
            }
            ScoreRule::UpperBound { max_val } => (1.0 - value / max_val).clamp(0.0, 1.0),
            ScoreRule::LowerBound { min_val } => (value / min_val).clamp(0.0, 1.0),
        }
    }
}

fn check_bound(name: &str, bound: f64) -> Result<()> {
    if !bound.is_finite() || bound <= 0.0 {
        return Err(MathError::InvalidBound(format!(
            "{} must be a positive finite number, got {}",
            name, bound
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn range_rule_inside_and_below() {
        let rule = ScoreRule::range(20.0, 28.0).unwrap();
        assert_eq!(rule.score(24.0), 1.0);
        assert_eq!(rule.score(20.0), 1.0);
        assert_eq!(rule.score(28.0), 1.0);
        assert!(close(rule.score(10.0), 0.5));
        assert_eq!(rule.score(-5.0), 0.0);
    }

    #[test]
    fn range_rule_above_high_ramps_down_then_clamps() {
        let rule = ScoreRule::range(20.0, 28.0).unwrap();
        assert!(close(rule.score(40.0), 16.0 / 28.0));
        assert_eq!(rule.score(56.0), 0.0);
        assert_eq!(rule.score(60.0), 0.0);
    }

    #[test]
    fn upper_bound_rule() {
        let rule = ScoreRule::upper(0.3).unwrap();
        assert_eq!(rule.score(0.0), 1.0);
        assert!(close(rule.score(0.15), 0.5));
        assert_eq!(rule.score(0.3), 0.0);
        assert_eq!(rule.score(3.0), 0.0);
        assert_eq!(rule.score(-0.3), 1.0);
    }

    #[test]
    fn lower_bound_rule_saturates() {
        let rule = ScoreRule::lower(5.0).unwrap();
        assert!(close(rule.score(2.5), 0.5));
        assert_eq!(rule.score(5.0), 1.0);
        assert_eq!(rule.score(9.0), 1.0);
        assert_eq!(rule.score(-1.0), 0.0);
    }

    #[test]
    fn nan_scores_zero_for_every_shape() {
        let rules = [
            ScoreRule::range(7.5, 8.0).unwrap(),
            ScoreRule::upper(0.05).unwrap(),
            ScoreRule::lower(6.0).unwrap(),
        ];
        for rule in rules {
            assert_eq!(rule.score(f64::NAN), 0.0);
        }
    }

    #[test]
    fn zero_and_inverted_bounds_are_rejected() {
        assert!(ScoreRule::upper(0.0).is_err());
        assert!(ScoreRule::lower(-1.0).is_err());
        assert!(ScoreRule::range(0.0, 5.0).is_err());
        assert!(ScoreRule::range(8.0, 7.5).is_err());
        assert!(ScoreRule::upper(f64::INFINITY).is_err());
    }

    #[test]
    fn rules_deserialize_from_untagged_json() {
        let range: ScoreRule = serde_json::from_str(r#"{"low": 20, "high": 28}"#).unwrap();
        let upper: ScoreRule = serde_json::from_str(r#"{"max_val": 0.3}"#).unwrap();
        let lower: ScoreRule = serde_json::from_str(r#"{"min_val": 5}"#).unwrap();

        assert_eq!(range, ScoreRule::RangeOptimal { low: 20.0, high: 28.0 });
        assert_eq!(upper, ScoreRule::UpperBound { max_val: 0.3 });
        assert_eq!(lower, ScoreRule::LowerBound { min_val: 5.0 });
    }
}
