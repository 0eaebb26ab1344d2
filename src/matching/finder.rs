//! Candidate finder
//!
//! Queries the document kinds mapped to a transaction's category and keeps
//! the candidates that qualify under the dual amount tolerance and the
//! category's date window, capped to the K closest by amount.

use bigdecimal::BigDecimal;
use chrono::Duration;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::traits::{CandidateQuery, DocumentSource};
use crate::types::{BankTransaction, CandidateDocument, Category, ReconcileResult};

/// Amount/date-bounded candidate retrieval
#[derive(Debug, Clone)]
pub struct CandidateFinder {
    config: Arc<EngineConfig>,
}

impl CandidateFinder {
    /// Create a finder over the shared engine configuration
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }

    /// Find qualifying candidates for a classified transaction.
    ///
    /// A candidate qualifies when
    /// `|candidate.amount - transaction.amount| <= tolerance_window` (boundary
    /// inclusive) and its date falls inside the category's window. The source
    /// is queried with the same bounds; results are re-filtered here so
    /// qualification does not depend on how strictly a backend interprets the
    /// query. At most `result_cap` candidates are returned, closest by amount
    /// first, ties broken by date and then document id.
    pub async fn find(
        &self,
        transaction: &BankTransaction,
        category: Category,
        source: &dyn DocumentSource,
    ) -> ReconcileResult<Vec<CandidateDocument>> {
        let window = self.config.tolerance_window(&transaction.amount);
        let min_amount = &transaction.amount - &window;
        let max_amount = &transaction.amount + &window;

        let from = transaction.date - Duration::days(self.config.lookback_days);
        let to = if category.allows_post_dated_documents() {
            transaction.date + Duration::days(self.config.lookahead_days)
        } else {
            transaction.date
        };

        let mut candidates = Vec::new();
        for kind in category.document_kinds() {
            let query = CandidateQuery {
                kind,
                min_amount: min_amount.clone(),
                max_amount: max_amount.clone(),
                from,
                to,
            };
            candidates.extend(source.find_candidates(&query).await?);
        }

        candidates.retain(|candidate| {
            let diff = (&candidate.amount - &transaction.amount).abs();
            diff <= window && candidate.date >= from && candidate.date <= to
        });

        candidates.sort_by(|a, b| {
            let diff_a = (&a.amount - &transaction.amount).abs();
            let diff_b = (&b.amount - &transaction.amount).abs();
            diff_a
                .cmp(&diff_b)
                .then_with(|| {
                    let days_a = (transaction.date - a.date).num_days().abs();
                    let days_b = (transaction.date - b.date).num_days().abs();
                    days_a.cmp(&days_b)
                })
                .then_with(|| a.document_id.cmp(&b.document_id))
        });
        candidates.truncate(self.config.result_cap);

        Ok(candidates)
    }
}
