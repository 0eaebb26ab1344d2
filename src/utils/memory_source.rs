//! In-memory document source for testing and development

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::traits::{CandidateQuery, DocumentSource};
use crate::types::{CandidateDocument, ReconcileResult};

/// In-memory [`DocumentSource`] backed by a shared document list.
///
/// Stands in for the invoice/payroll/tax/check subsystems in tests and
/// demos; cloning shares the underlying documents.
#[derive(Debug, Clone)]
pub struct MemoryDocumentSource {
    documents: Arc<RwLock<Vec<CandidateDocument>>>,
}

impl MemoryDocumentSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Add a document to the source
    pub fn add(&self, document: CandidateDocument) {
        self.documents.write().unwrap().push(document);
    }

    /// Remove all documents (useful for testing)
    pub fn clear(&self) {
        self.documents.write().unwrap().clear();
    }
}

impl Default for MemoryDocumentSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentSource for MemoryDocumentSource {
    async fn find_candidates(
        &self,
        query: &CandidateQuery,
    ) -> ReconcileResult<Vec<CandidateDocument>> {
        let documents = self.documents.read().unwrap();
        Ok(documents
            .iter()
            .filter(|doc| {
                doc.document_kind == query.kind
                    && doc.amount >= query.min_amount
                    && doc.amount <= query.max_amount
                    && doc.date >= query.from
                    && doc.date <= query.to
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentKind;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn doc(id: &str, kind: DocumentKind, amount: i64) -> CandidateDocument {
        CandidateDocument {
            document_id: id.to_string(),
            document_kind: kind,
            amount: BigDecimal::from(amount),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            counterparty_name: "Acme".to_string(),
            document_number: None,
        }
    }

    #[tokio::test]
    async fn test_filters_by_kind_and_bounds() {
        let source = MemoryDocumentSource::new();
        source.add(doc("inv-1", DocumentKind::Invoice, 100));
        source.add(doc("inv-2", DocumentKind::Invoice, 500));
        source.add(doc("pay-1", DocumentKind::Payroll, 100));

        let query = CandidateQuery {
            kind: DocumentKind::Invoice,
            min_amount: BigDecimal::from(50),
            max_amount: BigDecimal::from(150),
            from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        };

        let found = source.find_candidates(&query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].document_id, "inv-1");
    }
}
