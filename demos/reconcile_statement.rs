//! Reconcile a small bank statement against seeded documents.
//!
//! Run with: cargo run --example reconcile_statement

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use reconcile_core::{
    BankTransaction, BulkResult, CandidateDocument, Category, Direction, DocumentKind,
    EngineConfig, MemoryDocumentSource, ReconciliationEngine, TransactionState,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Documents normally come from the invoice/payroll/tax subsystems;
    // the in-memory source stands in for them here.
    let source = MemoryDocumentSource::new();
    source.add(CandidateDocument {
        document_id: "payroll-2024-03-jane".to_string(),
        document_kind: DocumentKind::Payroll,
        amount: BigDecimal::from(2450),
        date: date(2024, 2, 29),
        counterparty_name: "Jane Smith".to_string(),
        document_number: Some("PR-2024-03".to_string()),
    });
    source.add(CandidateDocument {
        document_id: "sale-batch-0301".to_string(),
        document_kind: DocumentKind::Invoice,
        // Card sales batched on Friday March 1st
        amount: "1834.50".parse()?,
        date: date(2024, 3, 1),
        counterparty_name: "Card sales".to_string(),
        document_number: None,
    });
    source.add(CandidateDocument {
        document_id: "inv-5521".to_string(),
        document_kind: DocumentKind::Invoice,
        amount: BigDecimal::from(980),
        date: date(2024, 2, 20),
        counterparty_name: "Acme Supplies".to_string(),
        document_number: Some("5521".to_string()),
    });

    let engine = ReconciliationEngine::new(source, EngineConfig::default())?;

    let statement = vec![
        BankTransaction::new(
            "stmt-001".to_string(),
            date(2024, 3, 4),
            "1834.50".parse()?,
            Direction::Inflow,
            "POS SETTLEMENT BATCH 0301".to_string(),
        ),
        BankTransaction::new(
            "stmt-002".to_string(),
            date(2024, 3, 1),
            BigDecimal::from(2450),
            Direction::Outflow,
            "PAYROLL JANE SMITH 202403".to_string(),
        ),
        BankTransaction::new(
            "stmt-003".to_string(),
            date(2024, 3, 5),
            BigDecimal::from(980),
            Direction::Outflow,
            "TRANSFER TO ACME SUPPLIES REF 5521".to_string(),
        ),
        BankTransaction::new(
            "stmt-004".to_string(),
            date(2024, 3, 8),
            "12.75".parse()?,
            Direction::Outflow,
            "MONTHLY MAINTENANCE FEE".to_string(),
        ),
    ];

    println!("=== Analysis ===");
    let outcomes = engine.analyze(statement).await?;
    for outcome in &outcomes {
        println!(
            "{} [{}] {:?} -> {:?}",
            outcome.transaction.id,
            outcome.transaction.description,
            outcome.transaction.category,
            outcome.transaction.state,
        );
        for suggestion in &outcome.suggestions {
            println!(
                "    #{} {} (score {:.2}, name {:.2})",
                suggestion.rank,
                suggestion.candidate.document_id,
                suggestion.score,
                suggestion.name_similarity,
            );
        }
        if let Some(issue) = &outcome.issue {
            println!("    issue: {:?}", issue);
        }
    }

    // Low-risk categories go through the auto-confirm policy in bulk
    println!("\n=== Bulk confirm ===");
    for category in [Category::PosSettlement, Category::Payroll] {
        for outcome in engine.confirm_bulk(category).await {
            match outcome.outcome {
                BulkResult::Confirmed(record) => {
                    println!("{} confirmed ({})", outcome.transaction_id, record.record_id)
                }
                BulkResult::Failed { reason } => {
                    println!("{} failed: {}", outcome.transaction_id, reason)
                }
            }
        }
    }

    // The supplier transfer never auto-confirms; apply its top suggestion
    println!("\n=== Manual confirm ===");
    if let Some(top) = engine.suggestions("stmt-003").first() {
        let record = engine
            .confirm("stmt-003", Some(&top.candidate.document_id))
            .await?;
        println!(
            "stmt-003 confirmed against {} ({:?}, record {})",
            top.candidate.document_id, record.mode, record.record_id
        );
    }

    // The bank fee has no originating document; confirm it as such
    if engine.transaction("stmt-004").map(|tx| tx.state) == Some(TransactionState::Suggested) {
        let record = engine.confirm("stmt-004", None).await?;
        println!("stmt-004 confirmed without a document (record {})", record.record_id);
    }

    println!("\n=== Final states ===");
    for tx in engine.transactions() {
        println!(
            "{} {:?} matched={:?}",
            tx.id, tx.state, tx.matched_document
        );
    }

    Ok(())
}
