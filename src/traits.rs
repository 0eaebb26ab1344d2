//! Traits for the external document-query capability
//!
//! The invoice, payroll, tax, and check subsystems stay outside this crate.
//! The engine consumes them through [`DocumentSource`], a read-only,
//! side-effect-free query interface that any backend (SQL, API, in-memory)
//! can implement.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{CandidateDocument, DocumentKind, ReconcileResult};

/// Amount- and date-bounded candidate query issued by the candidate finder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateQuery {
    /// Document kind to search
    pub kind: DocumentKind,
    /// Inclusive lower amount bound
    pub min_amount: BigDecimal,
    /// Inclusive upper amount bound
    pub max_amount: BigDecimal,
    /// Inclusive earliest document date
    pub from: NaiveDate,
    /// Inclusive latest document date
    pub to: NaiveDate,
}

/// Query capability provided by the document subsystems.
///
/// Implementations must be safe to call concurrently; the engine issues one
/// query per document kind per transaction, from a pool of worker tasks.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Return the documents of `query.kind` within the amount and date bounds.
    /// Result order does not matter; the finder re-sorts deterministically.
    async fn find_candidates(
        &self,
        query: &CandidateQuery,
    ) -> ReconcileResult<Vec<CandidateDocument>>;
}
