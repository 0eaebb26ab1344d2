//! Holiday and business-day calendar
//!
//! Holidays are a fixed list of month-day pairs. Moving holidays (Easter,
//! regional closures) are not modeled; this is a documented limitation of the
//! configuration, not of the arithmetic.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Business-day lookup table built from configured holidays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessCalendar {
    holidays: BTreeSet<(u32, u32)>,
}

impl BusinessCalendar {
    /// Build a calendar from (month, day) holiday pairs
    pub fn new(holidays: &[(u32, u32)]) -> Self {
        Self {
            holidays: holidays.iter().copied().collect(),
        }
    }

    /// Whether the date falls on a Saturday or Sunday
    pub fn is_weekend(&self, date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Whether the date matches a configured holiday, regardless of year
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&(date.month(), date.day()))
    }

    /// A business day is a weekday that is not a holiday
    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        !self.is_weekend(date) && !self.is_holiday(date)
    }

    /// Advance `n` business days, counting weekdays only.
    /// Holidays are corrected separately by the settlement projector.
    pub fn add_business_days(&self, date: NaiveDate, n: u32) -> NaiveDate {
        let mut current = date;
        for _ in 0..n {
            current += Duration::days(1);
            while self.is_weekend(current) {
                current += Duration::days(1);
            }
        }
        current
    }
}
