//! Core types and data structures for the reconciliation engine

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of money movement on the bank ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Money entering the account (credits on the bank feed)
    Inflow,
    /// Money leaving the account (debits on the bank feed)
    Outflow,
}

/// Closed category taxonomy assigned by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Card-payment batch credited by the acquiring bank
    PosSettlement,
    /// Acquirer commission charged against card settlements
    PosFee,
    /// Generic bank service charge
    BankFee,
    /// Salary disbursement to an employee
    Payroll,
    /// Tax filing payment to the revenue authority
    TaxFiling,
    /// Paper check cashed against the account
    CheckWithdrawal,
    /// Outbound transfer paying a supplier invoice
    SupplierTransfer,
    /// No classification rule matched
    Unclassified,
}

impl Category {
    /// All categories, in a stable order
    pub const ALL: [Category; 8] = [
        Category::PosSettlement,
        Category::PosFee,
        Category::BankFee,
        Category::Payroll,
        Category::TaxFiling,
        Category::CheckWithdrawal,
        Category::SupplierTransfer,
        Category::Unclassified,
    ];

    /// Document kinds searched for candidates of this category.
    /// `Unclassified` searches every kind.
    pub fn document_kinds(&self) -> Vec<DocumentKind> {
        match self {
            Category::PosSettlement | Category::PosFee | Category::SupplierTransfer => {
                vec![DocumentKind::Invoice]
            }
            Category::Payroll => vec![DocumentKind::Payroll],
            Category::TaxFiling => vec![DocumentKind::TaxFiling],
            Category::CheckWithdrawal => vec![DocumentKind::Check],
            Category::BankFee => vec![DocumentKind::Unknown],
            Category::Unclassified => vec![
                DocumentKind::Invoice,
                DocumentKind::Payroll,
                DocumentKind::TaxFiling,
                DocumentKind::Check,
                DocumentKind::Unknown,
            ],
        }
    }

    /// Whether the matching document may be dated after the bank transaction
    /// (checks are cut before they are cashed)
    pub fn allows_post_dated_documents(&self) -> bool {
        matches!(self, Category::CheckWithdrawal)
    }

    /// Whether a counterparty name can reliably be extracted from the bank
    /// description for this category
    pub fn has_name_signal(&self) -> bool {
        matches!(
            self,
            Category::Payroll
                | Category::TaxFiling
                | Category::CheckWithdrawal
                | Category::SupplierTransfer
        )
    }

    /// Whether this category may be confirmed without a matched document
    /// (fees frequently have no originating record)
    pub fn allows_no_document_confirm(&self) -> bool {
        matches!(self, Category::BankFee | Category::PosFee)
    }
}

/// Lifecycle state of a bank transaction within the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    /// Imported, not yet analyzed
    Pending,
    /// Analyzed; suggestions computed, awaiting confirm or ignore
    Suggested,
    /// Attributed to a document (or explicitly marked no-document)
    Confirmed,
    /// Explicitly set aside; terminal until reset
    Ignored,
}

/// One line of the bank ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    /// Opaque identifier, stable across re-imports of the same statement
    pub id: String,
    /// Operation/value date as reported by the bank
    pub date: NaiveDate,
    /// Unsigned amount; `direction` encodes the sign
    pub amount: BigDecimal,
    /// Direction of the money movement
    pub direction: Direction,
    /// Free text from the bank
    pub description: String,
    /// Category assigned by the classifier
    pub category: Category,
    /// Lifecycle state, owned by the state machine
    pub state: TransactionState,
    /// Confirmed candidate document id; `None` until confirmed
    pub matched_document: Option<String>,
}

impl BankTransaction {
    /// Create a new pending, unclassified transaction
    pub fn new(
        id: String,
        date: NaiveDate,
        amount: BigDecimal,
        direction: Direction,
        description: String,
    ) -> Self {
        Self {
            id,
            date,
            amount,
            direction,
            description,
            category: Category::Unclassified,
            state: TransactionState::Pending,
            matched_document: None,
        }
    }
}

/// Kind of source document a candidate was projected from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Invoice,
    Payroll,
    TaxFiling,
    Check,
    Unknown,
}

/// Read-only projection of a source document, regardless of origin subsystem.
///
/// The engine never persists a copy; ownership stays with the originating
/// subsystem behind the [`DocumentSource`](crate::traits::DocumentSource) trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDocument {
    /// Identifier within the originating subsystem
    pub document_id: String,
    /// Kind of source document
    pub document_kind: DocumentKind,
    /// Unsigned document amount
    pub amount: BigDecimal,
    /// Document date (issue date, pay date, sale date, ...)
    pub date: NaiveDate,
    /// Counterparty name as recorded on the document
    pub counterparty_name: String,
    /// Optional document number (invoice number, check number, ...)
    pub document_number: Option<String>,
}

/// One ranked suggestion produced by an analysis pass.
///
/// Suggestions are ephemeral: recomputed on every `analyze`, never persisted
/// independently of the pass that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSuggestion {
    /// Transaction this suggestion belongs to
    pub transaction_id: String,
    /// The candidate document
    pub candidate: CandidateDocument,
    /// Normalized similarity score in [0, 1]
    pub score: f64,
    /// Position within the suggestion list, 0 = best
    pub rank: usize,
    /// Name sub-score, surfaced so the auto-confirm policy and the
    /// presentation layer can explain the match
    pub name_similarity: f64,
}

/// How a confirmation was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmMode {
    Manual,
    Auto,
}

/// Durable result of a confirm transition; immutable once written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationRecord {
    /// Unique record identifier
    pub record_id: Uuid,
    /// Transaction that was confirmed
    pub transaction_id: String,
    /// Confirmed document id; `None` for no-document confirms
    pub document_id: Option<String>,
    /// When the confirmation was applied
    pub confirmed_at: NaiveDateTime,
    /// Manual or policy-driven confirmation
    pub mode: ConfirmMode,
}

/// Append-only reconciliation history entry.
///
/// A reset never rewrites history; it appends a tombstone after the
/// confirmation it supersedes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryEntry {
    Confirmation(ReconciliationRecord),
    Tombstone {
        transaction_id: String,
        reset_at: NaiveDateTime,
    },
}

impl HistoryEntry {
    /// Transaction id this entry refers to
    pub fn transaction_id(&self) -> &str {
        match self {
            HistoryEntry::Confirmation(record) => &record.transaction_id,
            HistoryEntry::Tombstone { transaction_id, .. } => transaction_id,
        }
    }
}

/// Errors that can occur in the reconciliation engine
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),
    #[error("Cannot {action} transaction '{transaction_id}' in state {state:?}")]
    IllegalTransition {
        transaction_id: String,
        state: TransactionState,
        action: &'static str,
    },
    #[error(
        "Transaction '{transaction_id}' is already confirmed with {confirmed:?}; \
         reset it before confirming with {requested:?}"
    )]
    StaleConfirmConflict {
        transaction_id: String,
        confirmed: Option<String>,
        requested: Option<String>,
    },
    #[error("Candidate '{candidate_id}' is not among the suggestions for transaction '{transaction_id}'")]
    UnknownCandidate {
        transaction_id: String,
        candidate_id: String,
    },
    #[error("Category {category:?} requires a document to confirm transaction '{transaction_id}'")]
    DocumentRequired {
        transaction_id: String,
        category: Category,
    },
    #[error("Candidate query timed out for transaction '{0}'")]
    CandidateQueryTimeout(String),
    #[error("Document source error: {0}")]
    Source(String),
    #[error("Settlement projection exceeded its holiday correction bound starting from {0}")]
    SettlementProjectionUnbounded(NaiveDate),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for reconciliation operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_document_kinds() {
        assert_eq!(
            Category::Payroll.document_kinds(),
            vec![DocumentKind::Payroll]
        );
        assert_eq!(Category::Unclassified.document_kinds().len(), 5);
    }

    #[test]
    fn test_category_flags() {
        assert!(Category::CheckWithdrawal.allows_post_dated_documents());
        assert!(!Category::Payroll.allows_post_dated_documents());
        assert!(Category::Payroll.has_name_signal());
        assert!(!Category::PosSettlement.has_name_signal());
        assert!(Category::BankFee.allows_no_document_confirm());
        assert!(!Category::CheckWithdrawal.allows_no_document_confirm());
    }

    #[test]
    fn test_category_serde_taxonomy_names() {
        let json = serde_json::to_string(&Category::PosSettlement).unwrap();
        assert_eq!(json, "\"pos_settlement\"");
        let back: Category = serde_json::from_str("\"check_withdrawal\"").unwrap();
        assert_eq!(back, Category::CheckWithdrawal);
    }
}
