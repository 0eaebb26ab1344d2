//! Similarity scorer
//!
//! Computes a normalized [0, 1] score for every (transaction, candidate)
//! pair as a weighted sum of amount proximity, date proximity, and name
//! similarity. Weights are category-dependent: categories whose descriptions
//! carry a counterparty name weight the name signal highest; the rest score
//! on amount and date alone so they are not penalized for a signal they
//! structurally cannot produce.

use bigdecimal::ToPrimitive;
use std::sync::Arc;

use crate::classify::Classification;
use crate::config::EngineConfig;
use crate::settlement::SettlementProjector;
use crate::types::{
    BankTransaction, CandidateDocument, Category, MatchSuggestion, ReconcileResult,
};

/// Sub-score weights (amount, date, name)
const NAME_SIGNAL_WEIGHTS: (f64, f64, f64) = (0.3, 0.2, 0.5);
const AMOUNT_DATE_WEIGHTS: (f64, f64, f64) = (0.6, 0.4, 0.0);

/// Pure, deterministic suggestion scorer
#[derive(Debug, Clone)]
pub struct Scorer {
    config: Arc<EngineConfig>,
}

impl Scorer {
    /// Create a scorer over the shared engine configuration
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }

    /// Score candidates and return ranked suggestions, best first.
    ///
    /// Ties are broken by closest date, then lexical candidate id, so
    /// identical inputs always produce identical ordering. For POS
    /// settlements the date proximity is measured against the candidate's
    /// projected settlement date; a projection failure aborts scoring for
    /// this transaction only.
    pub fn score(
        &self,
        transaction: &BankTransaction,
        classification: &Classification,
        candidates: Vec<CandidateDocument>,
        projector: &SettlementProjector,
    ) -> ReconcileResult<Vec<MatchSuggestion>> {
        let category = classification.category;
        let (amount_weight, date_weight, name_weight) = if category.has_name_signal() {
            NAME_SIGNAL_WEIGHTS
        } else {
            AMOUNT_DATE_WEIGHTS
        };

        let window = self
            .config
            .tolerance_window(&transaction.amount)
            .to_f64()
            .unwrap_or(0.0);
        let date_window = self.config.date_window_days(category) as f64;

        let mut scored = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let effective_date = if category == Category::PosSettlement {
                projector.project(candidate.date)?
            } else {
                candidate.date
            };

            let amount_diff = (&candidate.amount - &transaction.amount)
                .abs()
                .to_f64()
                .unwrap_or(f64::MAX);
            let amount_score = proximity(amount_diff, window);

            let day_diff = (transaction.date - effective_date).num_days().abs();
            let date_score = proximity(day_diff as f64, date_window);

            let needle = classification
                .counterparty
                .as_deref()
                .unwrap_or(&transaction.description);
            let name_score = name_similarity(needle, &candidate.counterparty_name);

            let score = amount_weight * amount_score
                + date_weight * date_score
                + name_weight * name_score;

            scored.push((candidate, score, name_score, day_diff));
        }

        scored.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| a.3.cmp(&b.3))
                .then_with(|| a.0.document_id.cmp(&b.0.document_id))
        });

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(rank, (candidate, score, name_score, _))| MatchSuggestion {
                transaction_id: transaction.id.clone(),
                candidate,
                score,
                rank,
                name_similarity: name_score,
            })
            .collect())
    }
}

/// `1 - diff / window`, clamped to [0, 1]. A zero-width window only matches
/// an exact difference of zero.
fn proximity(diff: f64, window: f64) -> f64 {
    if window <= 0.0 {
        return if diff == 0.0 { 1.0 } else { 0.0 };
    }
    (1.0 - diff / window).clamp(0.0, 1.0)
}

/// Token-overlap name similarity between a transaction description (or its
/// extracted counterparty token) and a candidate's counterparty name.
///
/// 1.0 for an exact or containment match after normalization, partial credit
/// proportional to the overlapping name tokens, 0.0 when either side has no
/// extractable tokens.
pub fn name_similarity(description: &str, counterparty: &str) -> f64 {
    let description_tokens = tokens(description);
    let name_tokens = tokens(counterparty);
    if description_tokens.is_empty() || name_tokens.is_empty() {
        return 0.0;
    }

    let description_joined = description_tokens.join(" ");
    let name_joined = name_tokens.join(" ");
    if description_joined.contains(&name_joined) || name_joined.contains(&description_joined) {
        return 1.0;
    }

    let overlap = name_tokens
        .iter()
        .filter(|token| description_tokens.contains(token))
        .count();
    overlap as f64 / name_tokens.len() as f64
}

fn tokens(text: &str) -> Vec<String> {
    text.to_uppercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() >= 2)
        .map(|token| token.to_string())
        .collect()
}
