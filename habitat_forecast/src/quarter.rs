//! Calendar quarters

use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One calendar quarter, identified by year and quarter number 1-4
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quarter {
    year: i32,
    quarter: u8,
}

impl Quarter {
    /// Create a quarter, rejecting quarter numbers outside 1-4
    pub fn new(year: i32, quarter: u8) -> Result<Self> {
        if !(1..=4).contains(&quarter) {
            return Err(ForecastError::InvalidParameter(format!(
                "Quarter must be between 1 and 4, got {}",
                quarter
            )));
        }
        Ok(Self { year, quarter })
    }

    /// Quarter containing a calendar date
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            quarter: ((date.month0() / 3) + 1) as u8,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn quarter(&self) -> u8 {
        self.quarter
    }

    /// The following quarter, wrapping Q4 into Q1 of the next year
    pub fn next(&self) -> Self {
        if self.quarter == 4 {
            Self {
                year: self.year + 1,
                quarter: 1,
            }
        } else {
            Self {
                year: self.year,
                quarter: self.quarter + 1,
            }
        }
    }

    /// `n` consecutive quarters starting at `self`
    pub fn span(self, n: usize) -> Vec<Quarter> {
        let mut quarters = Vec::with_capacity(n);
        let mut current = self;
        for _ in 0..n {
            quarters.push(current);
            current = current.next();
        }
        quarters
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-Q{}", self.year, self.quarter)
    }
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

impl FromStr for Quarter {
    type Err = ForecastError;

    /// Accepts `2020Q1`, `2020-Q1`, `2020 q1` and calendar dates
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();

        if let Some(pos) = trimmed.find(['Q', 'q']) {
            let year = trimmed[..pos].trim_end_matches(['-', ' ']);
            let quarter = &trimmed[pos + 1..];
            if let (Ok(year), Ok(quarter)) = (year.parse::<i32>(), quarter.parse::<u8>()) {
                return Quarter::new(year, quarter);
            }
        }

        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
                return Ok(Quarter::from_date(date));
            }
        }
        for format in DATETIME_FORMATS {
            if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(Quarter::from_date(datetime.date()));
            }
        }

        Err(ForecastError::DataError(format!(
            "Cannot parse quarter from {:?}",
            s
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_wraps_into_following_year() {
        let q4 = Quarter::new(2026, 4).unwrap();
        assert_eq!(q4.next(), Quarter::new(2027, 1).unwrap());
        assert_eq!(q4.next().next(), Quarter::new(2027, 2).unwrap());
    }

    #[test]
    fn span_produces_consecutive_quarters() {
        let start = Quarter::new(2025, 3).unwrap();
        let labels: Vec<String> = start.span(4).iter().map(|q| q.to_string()).collect();
        assert_eq!(labels, ["2025-Q3", "2025-Q4", "2026-Q1", "2026-Q2"]);
    }

    #[test]
    fn rejects_out_of_range_quarter() {
        assert!(Quarter::new(2026, 0).is_err());
        assert!(Quarter::new(2026, 5).is_err());
    }

    #[test]
    fn parses_labels_and_dates() {
        let expected = Quarter::new(2020, 2).unwrap();
        assert_eq!("2020Q2".parse::<Quarter>().unwrap(), expected);
        assert_eq!("2020-Q2".parse::<Quarter>().unwrap(), expected);
        assert_eq!("2020 q2".parse::<Quarter>().unwrap(), expected);
        assert_eq!("2020-05-17".parse::<Quarter>().unwrap(), expected);
        assert_eq!("2020-06-30 00:00:00".parse::<Quarter>().unwrap(), expected);
        assert_eq!("05/17/2020".parse::<Quarter>().unwrap(), expected);
        assert_eq!("01/04/2020".parse::<Quarter>().unwrap(), Quarter::new(2020, 1).unwrap());
        assert!("not a quarter".parse::<Quarter>().is_err());
        assert!("2020Q7".parse::<Quarter>().is_err());
    }

    #[test]
    fn slash_dates_are_month_first() {
        let feb = "02/10/2021".parse::<Quarter>().unwrap();
        let apr = "04/02/2021".parse::<Quarter>().unwrap();
        assert_eq!(feb, Quarter::new(2021, 1).unwrap());
        assert_eq!(apr, Quarter::new(2021, 2).unwrap());
        assert!(feb < apr);
        assert_eq!("03/05/2021".parse::<Quarter>().unwrap(), Quarter::new(2021, 1).unwrap());
        assert!("13/01/2021".parse::<Quarter>().is_err());
    }

    #[test]
    fn ordering_is_chronological() {
        let a = Quarter::new(2024, 4).unwrap();
        let b = Quarter::new(2025, 1).unwrap();
        assert!(a < b);
    }
}
