//! Transaction classifier
//!
//! An ordered rule list over the bank description and direction; the first
//! matching rule wins. Classification is total: when no rule matches, the
//! outcome is [`Category::Unclassified`], never an error.

use serde::{Deserialize, Serialize};

use crate::types::{BankTransaction, Category, Direction};

/// Words dropped when extracting a counterparty token from a description
const STOPWORDS: [&str; 8] = ["TO", "OF", "FOR", "DE", "LA", "REF", "NUM", "NO"];

/// Result of classifying one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Category assigned by the first matching rule
    pub category: Category,
    /// Counterparty token extracted from the description, for categories
    /// where the description reliably carries one
    pub counterparty: Option<String>,
}

/// One classification rule: keyword set plus optional direction requirement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierRule {
    category: Category,
    direction: Option<Direction>,
    keywords: Vec<String>,
    extracts_counterparty: bool,
}

impl ClassifierRule {
    /// Create a rule matching any of `keywords` (case-insensitive) in the
    /// given direction (`None` matches both directions)
    pub fn new(category: Category, direction: Option<Direction>, keywords: &[&str]) -> Self {
        Self {
            category,
            direction,
            keywords: keywords.iter().map(|k| k.to_uppercase()).collect(),
            extracts_counterparty: false,
        }
    }

    /// Enable counterparty extraction from the text after the matched keyword
    pub fn with_counterparty_extraction(mut self) -> Self {
        self.extracts_counterparty = true;
        self
    }

    /// Returns the matched keyword if the rule applies to this transaction
    fn matches<'a>(&'a self, transaction: &BankTransaction, description: &str) -> Option<&'a str> {
        if let Some(direction) = self.direction {
            if direction != transaction.direction {
                return None;
            }
        }
        self.keywords
            .iter()
            .find(|keyword| description.contains(keyword.as_str()))
            .map(|keyword| keyword.as_str())
    }
}

/// Ordered-rule transaction classifier
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<ClassifierRule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl Classifier {
    /// Create a classifier with a custom rule list. Order is significant:
    /// the first matching rule wins.
    pub fn new(rules: Vec<ClassifierRule>) -> Self {
        Self { rules }
    }

    /// Classify one transaction. Deterministic and total: identical
    /// description, amount, and direction always yield the same category.
    pub fn classify(&self, transaction: &BankTransaction) -> Classification {
        let description = transaction.description.to_uppercase();

        for rule in &self.rules {
            if let Some(keyword) = rule.matches(transaction, &description) {
                let counterparty = if rule.extracts_counterparty {
                    extract_counterparty(&description, keyword)
                } else {
                    None
                };
                return Classification {
                    category: rule.category,
                    counterparty,
                };
            }
        }

        Classification {
            category: Category::Unclassified,
            counterparty: None,
        }
    }
}

/// Take the alphabetic tokens after the matched keyword, dropping reference
/// noise (digits, short codes, stopwords)
fn extract_counterparty(description: &str, keyword: &str) -> Option<String> {
    let position = description.find(keyword)?;
    let remainder = &description[position + keyword.len()..];

    let tokens: Vec<&str> = remainder
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| {
            token.len() >= 2
                && token.chars().all(|c| c.is_alphabetic())
                && !STOPWORDS.contains(token)
        })
        .collect();

    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

/// Default rule set covering the whole taxonomy.
///
/// Ordering matters: POS-specific fee wording must be tried before the
/// generic bank-fee rule.
pub fn default_rules() -> Vec<ClassifierRule> {
    vec![
        ClassifierRule::new(
            Category::PosSettlement,
            Some(Direction::Inflow),
            &[
                "POS SETTLEMENT",
                "CARD SETTLEMENT",
                "POS BATCH",
                "MERCHANT SETTLEMENT",
                "TPV",
            ],
        ),
        ClassifierRule::new(
            Category::PosFee,
            Some(Direction::Outflow),
            &["POS FEE", "MERCHANT FEE", "CARD COMMISSION", "ACQUIRER FEE"],
        ),
        ClassifierRule::new(
            Category::Payroll,
            Some(Direction::Outflow),
            &["PAYROLL", "SALARY", "WAGES", "NOMINA"],
        )
        .with_counterparty_extraction(),
        ClassifierRule::new(
            Category::TaxFiling,
            Some(Direction::Outflow),
            &["TAX", "VAT", "WITHHOLDING", "IMPUESTO"],
        )
        .with_counterparty_extraction(),
        ClassifierRule::new(
            Category::CheckWithdrawal,
            Some(Direction::Outflow),
            &["CHECK", "CHEQUE"],
        )
        .with_counterparty_extraction(),
        ClassifierRule::new(
            Category::SupplierTransfer,
            Some(Direction::Outflow),
            &["TRANSFER TO", "WIRE TO", "SUPPLIER", "PAYMENT TO"],
        )
        .with_counterparty_extraction(),
        ClassifierRule::new(
            Category::BankFee,
            Some(Direction::Outflow),
            &["FEE", "SERVICE CHARGE", "COMMISSION", "MAINTENANCE"],
        ),
    ]
}
