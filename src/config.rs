//! Engine configuration
//!
//! Tolerances, date windows, holidays, and auto-confirm thresholds are
//! supplied here once, loaded at startup, and treated as read-only by the
//! engine.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::policy::AutoConfirmRule;
use crate::types::{Category, ReconcileError, ReconcileResult};

/// Configuration surface of the reconciliation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Relative amount tolerance as a percentage of the transaction amount
    pub relative_tolerance_pct: u32,
    /// Absolute floor of the tolerance window, in currency units.
    /// Keeps small transactions matchable where the relative band collapses.
    pub absolute_floor: BigDecimal,
    /// How many days before the transaction date candidates may be dated
    pub lookback_days: i64,
    /// How many days after the transaction date candidates may be dated,
    /// applied only to categories whose documents can post-date the
    /// transaction (checks cashed later)
    pub lookahead_days: i64,
    /// Maximum number of candidates handed to the scorer per transaction
    pub result_cap: usize,
    /// Settlement lag for POS batches, in business days
    pub settlement_lag_days: u32,
    /// Public holidays as (month, day) pairs. Fixed dates only; moving
    /// holidays are a known limitation of this calendar.
    pub holidays: Vec<(u32, u32)>,
    /// Minimum name similarity for single-candidate auto-confirm on
    /// payroll/tax categories
    pub name_similarity_threshold: f64,
    /// Upper bound on each external candidate query
    pub query_timeout: Duration,
    /// Worker-pool size for batch analysis
    pub max_concurrency: usize,
    /// Per-category overrides of the default auto-confirm table
    pub policy_overrides: HashMap<Category, AutoConfirmRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            relative_tolerance_pct: 10,
            absolute_floor: BigDecimal::from(1),
            lookback_days: 90,
            lookahead_days: 30,
            result_cap: 20,
            settlement_lag_days: 1,
            holidays: vec![(1, 1), (12, 25)],
            name_similarity_threshold: 0.85,
            query_timeout: Duration::from_secs(5),
            max_concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            policy_overrides: HashMap::new(),
        }
    }
}

impl EngineConfig {
    /// Validate the configuration before handing it to the engine
    pub fn validate(&self) -> ReconcileResult<()> {
        if self.relative_tolerance_pct > 100 {
            return Err(ReconcileError::Config(
                "Relative tolerance cannot exceed 100%".to_string(),
            ));
        }
        if self.absolute_floor < BigDecimal::from(0) {
            return Err(ReconcileError::Config(
                "Absolute tolerance floor cannot be negative".to_string(),
            ));
        }
        if self.lookback_days < 0 || self.lookahead_days < 0 {
            return Err(ReconcileError::Config(
                "Date windows cannot be negative".to_string(),
            ));
        }
        if self.result_cap == 0 {
            return Err(ReconcileError::Config(
                "Result cap must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.name_similarity_threshold) {
            return Err(ReconcileError::Config(
                "Name similarity threshold must be within [0, 1]".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(ReconcileError::Config(
                "Worker pool must have at least one worker".to_string(),
            ));
        }
        for &(month, day) in &self.holidays {
            if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
                return Err(ReconcileError::Config(format!(
                    "Invalid holiday month-day pair: ({}, {})",
                    month, day
                )));
            }
        }
        Ok(())
    }

    /// Dual-threshold tolerance window for a transaction amount:
    /// `max(relative_tolerance × amount, absolute_floor)`
    pub fn tolerance_window(&self, amount: &BigDecimal) -> BigDecimal {
        let relative =
            amount * BigDecimal::from(self.relative_tolerance_pct) / BigDecimal::from(100);
        if relative >= self.absolute_floor {
            relative
        } else {
            self.absolute_floor.clone()
        }
    }

    /// Width of the candidate date window for a category, in days.
    /// Used both to bound the candidate query and to normalize the date
    /// proximity sub-score.
    pub fn date_window_days(&self, category: Category) -> i64 {
        if category.allows_post_dated_documents() {
            self.lookback_days + self.lookahead_days
        } else {
            self.lookback_days
        }
    }
}
