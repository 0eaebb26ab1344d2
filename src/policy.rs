//! Auto-confirm policy
//!
//! Decides, per category, whether the top suggestion may be applied without
//! human review. High-volume, structurally unambiguous categories (fees,
//! settlements) are safe to auto-confirm; categories with counterparty
//! ambiguity or legal weight (checks, payroll) keep a human in the loop.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::EngineConfig;
use crate::types::{Category, MatchSuggestion};

/// Per-category auto-confirm rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoConfirmRule {
    /// Auto-confirm whenever a suggestion exists
    WhenSuggested,
    /// Auto-confirm only a single candidate whose name similarity reaches
    /// the configured threshold
    SingleHighNameMatch,
    /// Always require manual confirmation
    Never,
}

/// Category-to-rule policy table, built from defaults plus config overrides
#[derive(Debug, Clone)]
pub struct AutoConfirmPolicy {
    rules: HashMap<Category, AutoConfirmRule>,
    name_similarity_threshold: f64,
}

/// Default policy table: fees and settlements auto-confirm when suggested,
/// payroll and tax need a single high-confidence name match, everything with
/// counterparty ambiguity stays manual.
fn default_table() -> HashMap<Category, AutoConfirmRule> {
    let mut table = HashMap::new();
    table.insert(Category::PosSettlement, AutoConfirmRule::WhenSuggested);
    table.insert(Category::PosFee, AutoConfirmRule::WhenSuggested);
    table.insert(Category::BankFee, AutoConfirmRule::WhenSuggested);
    table.insert(Category::Payroll, AutoConfirmRule::SingleHighNameMatch);
    table.insert(Category::TaxFiling, AutoConfirmRule::SingleHighNameMatch);
    table.insert(Category::CheckWithdrawal, AutoConfirmRule::Never);
    table.insert(Category::SupplierTransfer, AutoConfirmRule::Never);
    table.insert(Category::Unclassified, AutoConfirmRule::Never);
    table
}

impl AutoConfirmPolicy {
    /// Build the policy from the engine configuration, applying any
    /// per-category overrides on top of the default table
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut rules = default_table();
        for (&category, &rule) in &config.policy_overrides {
            rules.insert(category, rule);
        }
        Self {
            rules,
            name_similarity_threshold: config.name_similarity_threshold,
        }
    }

    /// The rule applied to a category
    pub fn rule(&self, category: Category) -> AutoConfirmRule {
        self.rules
            .get(&category)
            .copied()
            .unwrap_or(AutoConfirmRule::Never)
    }

    /// Whether the given ranked suggestions warrant confirming without
    /// human review
    pub fn should_auto_confirm(&self, category: Category, suggestions: &[MatchSuggestion]) -> bool {
        match self.rule(category) {
            AutoConfirmRule::WhenSuggested => !suggestions.is_empty(),
            AutoConfirmRule::SingleHighNameMatch => {
                suggestions.len() == 1
                    && suggestions[0].name_similarity >= self.name_similarity_threshold
            }
            AutoConfirmRule::Never => false,
        }
    }
}
