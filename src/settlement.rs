//! Settlement-date projector for POS card batches
//!
//! A card batch taken at the point of sale is credited to the merchant
//! account one or more business days later. Projecting that landing date lets
//! POS bank credits be matched against the correct day's sales total instead
//! of the raw operation date.

use chrono::{Duration, NaiveDate};

use crate::calendar::BusinessCalendar;
use crate::types::{ReconcileError, ReconcileResult};

/// Upper bound on the holiday correction walk. Exceeding it means the
/// holiday table blocks every nearby day, which is a configuration problem
/// and must not loop unboundedly.
const MAX_HOLIDAY_CORRECTIONS: u32 = 5;

/// Projects the expected bank-credit date of a card batch
#[derive(Debug, Clone)]
pub struct SettlementProjector {
    calendar: BusinessCalendar,
    lag_days: u32,
}

impl SettlementProjector {
    /// Create a projector with the given settlement lag in business days
    pub fn new(calendar: BusinessCalendar, lag_days: u32) -> Self {
        Self { calendar, lag_days }
    }

    /// Project the settlement date from the operation date.
    ///
    /// Advances the settlement lag in business days (Friday operations land
    /// on Monday), then walks forward one calendar day at a time while the
    /// landing date is a weekend or holiday, bounded by
    /// [`MAX_HOLIDAY_CORRECTIONS`].
    pub fn project(&self, operation_date: NaiveDate) -> ReconcileResult<NaiveDate> {
        let mut landing = self.calendar.add_business_days(operation_date, self.lag_days);

        let mut corrections = 0;
        while !self.calendar.is_business_day(landing) {
            if corrections >= MAX_HOLIDAY_CORRECTIONS {
                return Err(ReconcileError::SettlementProjectionUnbounded(operation_date));
            }
            landing += Duration::days(1);
            corrections += 1;
        }

        Ok(landing)
    }
}
