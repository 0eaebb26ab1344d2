//! Integration tests for reconcile-core

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::time::Duration;

use reconcile_core::{
    AnalysisIssue, BankTransaction, BulkResult, CandidateDocument, CandidateQuery, Category,
    ConfirmMode, Direction, DocumentKind, DocumentSource, EngineConfig, HistoryEntry,
    MemoryDocumentSource, ReconcileError, ReconcileResult, ReconciliationEngine, TransactionState,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn transaction(
    id: &str,
    amount: i64,
    direction: Direction,
    description: &str,
) -> BankTransaction {
    BankTransaction::new(
        id.to_string(),
        date(2024, 3, 15),
        BigDecimal::from(amount),
        direction,
        description.to_string(),
    )
}

fn document(
    id: &str,
    kind: DocumentKind,
    amount: &str,
    doc_date: NaiveDate,
    name: &str,
) -> CandidateDocument {
    CandidateDocument {
        document_id: id.to_string(),
        document_kind: kind,
        amount: amount.parse().unwrap(),
        date: doc_date,
        counterparty_name: name.to_string(),
        document_number: None,
    }
}

#[tokio::test]
async fn test_confirm_is_idempotent() {
    let source = MemoryDocumentSource::new();
    source.add(document(
        "inv-1",
        DocumentKind::Invoice,
        "500",
        date(2024, 3, 10),
        "Acme Supplies",
    ));
    source.add(document(
        "inv-2",
        DocumentKind::Invoice,
        "510",
        date(2024, 3, 12),
        "Other Vendor",
    ));

    let engine = ReconciliationEngine::new(source, EngineConfig::default()).unwrap();
    // Supplier transfers never auto-confirm, so the confirm stays manual
    engine
        .analyze(vec![transaction(
            "t1",
            500,
            Direction::Outflow,
            "TRANSFER TO ACME SUPPLIES",
        )])
        .await
        .unwrap();

    let first = engine.confirm("t1", Some("inv-1")).await.unwrap();
    let second = engine.confirm("t1", Some("inv-1")).await.unwrap();

    assert_eq!(first.record_id, second.record_id);
    assert_eq!(first.mode, ConfirmMode::Manual);

    // Exactly one confirmation in history after the repeated call
    let confirmations = engine
        .history("t1")
        .iter()
        .filter(|e| matches!(e, HistoryEntry::Confirmation(_)))
        .count();
    assert_eq!(confirmations, 1);

    // A different candidate without reset is a conflict, not an overwrite
    let conflict = engine.confirm("t1", Some("inv-2")).await;
    assert!(matches!(
        conflict,
        Err(ReconcileError::StaleConfirmConflict { .. })
    ));
    assert_eq!(
        engine.transaction("t1").unwrap().matched_document.as_deref(),
        Some("inv-1")
    );

    // After a reset and re-analysis the other candidate is acceptable
    engine.reset("t1").await.unwrap();
    engine
        .analyze(vec![transaction(
            "t1",
            500,
            Direction::Outflow,
            "TRANSFER TO ACME SUPPLIES",
        )])
        .await
        .unwrap();
    engine.confirm("t1", Some("inv-2")).await.unwrap();

    let history = engine.history("t1");
    assert_eq!(history.len(), 3); // confirm, tombstone, confirm
    assert!(matches!(history[1], HistoryEntry::Tombstone { .. }));
}

#[tokio::test]
async fn test_analyze_is_deterministic() {
    let source = MemoryDocumentSource::new();
    for (id, amount) in [("inv-a", "495"), ("inv-b", "505"), ("inv-c", "500")] {
        source.add(document(
            id,
            DocumentKind::Invoice,
            amount,
            date(2024, 3, 10),
            "Acme Supplies",
        ));
    }

    let engine = ReconciliationEngine::new(source, EngineConfig::default()).unwrap();
    let tx = transaction("t1", 500, Direction::Outflow, "TRANSFER TO ACME SUPPLIES");

    let first = engine.analyze(vec![tx.clone()]).await.unwrap();
    let second = engine.analyze(vec![tx]).await.unwrap();

    assert_eq!(first[0].transaction.category, Category::SupplierTransfer);
    assert_eq!(
        first[0].transaction.category,
        second[0].transaction.category
    );
    assert_eq!(first[0].suggestions, second[0].suggestions);
    assert_eq!(first[0].suggestions[0].candidate.document_id, "inv-c");
}

#[tokio::test]
async fn test_tolerance_boundary_through_engine() {
    let source = MemoryDocumentSource::new();
    // 10% of 1000 = 100 window: 1100 is in, 1101 is out
    source.add(document(
        "at-boundary",
        DocumentKind::Invoice,
        "1100",
        date(2024, 3, 10),
        "Acme",
    ));
    source.add(document(
        "beyond",
        DocumentKind::Invoice,
        "1101",
        date(2024, 3, 10),
        "Acme",
    ));

    let engine = ReconciliationEngine::new(source, EngineConfig::default()).unwrap();
    let outcomes = engine
        .analyze(vec![transaction(
            "t1",
            1000,
            Direction::Outflow,
            "TRANSFER TO ACME",
        )])
        .await
        .unwrap();

    let ids: Vec<&str> = outcomes[0]
        .suggestions
        .iter()
        .map(|s| s.candidate.document_id.as_str())
        .collect();
    assert_eq!(ids, vec!["at-boundary"]);
}

#[tokio::test]
async fn test_no_candidate_path_stays_suggested() {
    let engine =
        ReconciliationEngine::new(MemoryDocumentSource::new(), EngineConfig::default()).unwrap();
    let outcomes = engine
        .analyze(vec![transaction(
            "t1",
            750,
            Direction::Outflow,
            "TRANSFER TO NOBODY KNOWN",
        )])
        .await
        .unwrap();

    assert!(outcomes[0].suggestions.is_empty());
    assert!(outcomes[0].issue.is_none());
    assert_eq!(
        engine.transaction("t1").unwrap().state,
        TransactionState::Suggested
    );
}

#[tokio::test]
async fn test_auto_confirm_gating() {
    let source = MemoryDocumentSource::new();
    source.add(document(
        "fee-1",
        DocumentKind::Invoice,
        "25",
        date(2024, 3, 14),
        "Acquirer",
    ));
    source.add(document(
        "chk-1",
        DocumentKind::Check,
        "900",
        date(2024, 3, 12),
        "John Carpenter",
    ));

    let engine = ReconciliationEngine::new(source, EngineConfig::default()).unwrap();
    let outcomes = engine
        .analyze(vec![
            transaction("fee", 25, Direction::Outflow, "POS FEE MARCH"),
            transaction("check", 900, Direction::Outflow, "CHECK 1204 JOHN CARPENTER"),
        ])
        .await
        .unwrap();
    assert_eq!(outcomes[0].transaction.category, Category::PosFee);
    assert_eq!(outcomes[1].transaction.category, Category::CheckWithdrawal);

    // The fee auto-confirms off its single suggestion
    let fee_outcomes = engine.confirm_bulk(Category::PosFee).await;
    assert!(matches!(fee_outcomes[0].outcome, BulkResult::Confirmed(_)));
    let fee = engine.transaction("fee").unwrap();
    assert_eq!(fee.state, TransactionState::Confirmed);
    assert_eq!(fee.matched_document.as_deref(), Some("fee-1"));
    match &engine.history("fee")[0] {
        HistoryEntry::Confirmation(record) => assert_eq!(record.mode, ConfirmMode::Auto),
        other => panic!("expected confirmation, got {:?}", other),
    }

    // A perfect-scoring check still waits for a human
    let check_outcomes = engine.confirm_bulk(Category::CheckWithdrawal).await;
    match &check_outcomes[0].outcome {
        BulkResult::Failed { reason } => assert!(reason.contains("manual")),
        other => panic!("expected failure for the check, got {:?}", other),
    }
    assert_eq!(
        engine.transaction("check").unwrap().state,
        TransactionState::Suggested
    );
    assert!(!engine.suggestions("check").is_empty());
}

#[tokio::test]
async fn test_payroll_auto_confirm_requires_single_high_name_match() {
    let source = MemoryDocumentSource::new();
    source.add(document(
        "pay-1",
        DocumentKind::Payroll,
        "2500",
        date(2024, 3, 14),
        "John Doe",
    ));

    let engine = ReconciliationEngine::new(source.clone(), EngineConfig::default()).unwrap();
    engine
        .analyze(vec![transaction(
            "t1",
            2500,
            Direction::Outflow,
            "PAYROLL JOHN DOE",
        )])
        .await
        .unwrap();
    engine.confirm_bulk(Category::Payroll).await;
    assert_eq!(
        engine.transaction("t1").unwrap().state,
        TransactionState::Confirmed
    );

    // A second plausible candidate makes the match ambiguous: manual review
    source.add(document(
        "pay-2",
        DocumentKind::Payroll,
        "2500",
        date(2024, 3, 13),
        "John Doerr",
    ));
    let engine = ReconciliationEngine::new(source, EngineConfig::default()).unwrap();
    engine
        .analyze(vec![transaction(
            "t2",
            2500,
            Direction::Outflow,
            "PAYROLL JOHN DOE",
        )])
        .await
        .unwrap();
    let outcomes = engine.confirm_bulk(Category::Payroll).await;
    assert!(matches!(outcomes[0].outcome, BulkResult::Failed { .. }));
    assert_eq!(
        engine.transaction("t2").unwrap().state,
        TransactionState::Suggested
    );
}

#[tokio::test]
async fn test_confirm_bulk_reports_partial_failure() {
    let source = MemoryDocumentSource::new();
    for i in 1..=4u32 {
        source.add(document(
            &format!("fee-inv-{}", i),
            DocumentKind::Invoice,
            &(i * 100).to_string(),
            date(2024, 3, 10),
            "Acquirer",
        ));
    }

    let engine = ReconciliationEngine::new(source, EngineConfig::default()).unwrap();
    let mut batch: Vec<BankTransaction> = (1..=4u32)
        .map(|i| {
            transaction(
                &format!("fee-{}", i),
                (i * 100) as i64,
                Direction::Outflow,
                "MERCHANT FEE",
            )
        })
        .collect();
    // The fifth fee has no qualifying document at all
    batch.push(transaction("fee-5", 777, Direction::Outflow, "MERCHANT FEE"));
    engine.analyze(batch).await.unwrap();

    let outcomes = engine.confirm_bulk(Category::PosFee).await;
    assert_eq!(outcomes.len(), 5);

    let confirmed: Vec<&str> = outcomes
        .iter()
        .filter(|o| matches!(o.outcome, BulkResult::Confirmed(_)))
        .map(|o| o.transaction_id.as_str())
        .collect();
    assert_eq!(confirmed, vec!["fee-1", "fee-2", "fee-3", "fee-4"]);

    match &outcomes[4].outcome {
        BulkResult::Failed { reason } => {
            assert_eq!(outcomes[4].transaction_id, "fee-5");
            assert!(reason.contains("no suggestion"));
        }
        other => panic!("expected failure for fee-5, got {:?}", other),
    }

    // The failure did not disturb the other four
    for i in 1..=4 {
        assert_eq!(
            engine.transaction(&format!("fee-{}", i)).unwrap().state,
            TransactionState::Confirmed
        );
    }
    assert_eq!(
        engine.transaction("fee-5").unwrap().state,
        TransactionState::Suggested
    );
}

/// Source that sleeps past any reasonable timeout before answering
struct SlowSource {
    delay: Duration,
}

#[async_trait]
impl DocumentSource for SlowSource {
    async fn find_candidates(
        &self,
        _query: &CandidateQuery,
    ) -> ReconcileResult<Vec<CandidateDocument>> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_query_timeout_degrades_gracefully() {
    let config = EngineConfig {
        query_timeout: Duration::from_millis(20),
        ..EngineConfig::default()
    };
    let engine = ReconciliationEngine::new(
        SlowSource {
            delay: Duration::from_millis(500),
        },
        config,
    )
    .unwrap();

    let outcomes = engine
        .analyze(vec![transaction(
            "t1",
            100,
            Direction::Outflow,
            "MERCHANT FEE",
        )])
        .await
        .unwrap();

    assert_eq!(outcomes[0].issue, Some(AnalysisIssue::CandidateQueryTimeout));
    assert!(outcomes[0].suggestions.is_empty());
    // Degraded, not stalled or auto-confirmed
    assert_eq!(
        engine.transaction("t1").unwrap().state,
        TransactionState::Suggested
    );
}

#[tokio::test]
async fn test_records_serialize_for_the_presentation_layer() {
    let source = MemoryDocumentSource::new();
    source.add(document(
        "inv-1",
        DocumentKind::Invoice,
        "500",
        date(2024, 3, 10),
        "Acme Supplies",
    ));

    let engine = ReconciliationEngine::new(source, EngineConfig::default()).unwrap();
    engine
        .analyze(vec![transaction(
            "t1",
            500,
            Direction::Outflow,
            "TRANSFER TO ACME SUPPLIES",
        )])
        .await
        .unwrap();
    let record = engine.confirm("t1", Some("inv-1")).await.unwrap();

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["transaction_id"], "t1");
    assert_eq!(json["document_id"], "inv-1");
    assert_eq!(json["mode"], "manual");
}
