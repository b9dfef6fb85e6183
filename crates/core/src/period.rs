use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive date range, used for statement periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    /// Builds a range from two optional bounds, swapping them if reversed.
    pub fn from_bounds(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<Self> {
        match (start, end) {
            (Some(s), Some(e)) if s <= e => Some(DateRange::new(s, e)),
            (Some(s), Some(e)) => Some(DateRange::new(e, s)),
            _ => None,
        }
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn date_range_contains() {
        let range = DateRange::new(d(2026, 2, 1), d(2026, 2, 28));
        assert!(range.contains(d(2026, 2, 15)));
        assert!(range.contains(d(2026, 2, 1))); // inclusive start
        assert!(range.contains(d(2026, 2, 28))); // inclusive end
        assert!(!range.contains(d(2026, 3, 1)));
    }

    #[test]
    fn from_bounds_requires_both_ends() {
        assert!(DateRange::from_bounds(Some(d(2026, 1, 1)), None).is_none());
        let swapped = DateRange::from_bounds(Some(d(2026, 1, 31)), Some(d(2026, 1, 1))).unwrap();
        assert_eq!(swapped.start, d(2026, 1, 1));
        assert_eq!(swapped.to_string(), "2026-01-01 to 2026-01-31");
    }
}
