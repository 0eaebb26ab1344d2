//! # Reconcile Core
//!
//! A bank reconciliation decision engine that attributes every movement in a
//! bank feed to the accounting document that caused it.
//!
//! ## Features
//!
//! - **Classification**: ordered-rule categorization of bank transactions
//!   into a closed taxonomy (POS settlements, fees, payroll, tax, checks,
//!   supplier transfers)
//! - **Candidate matching**: amount- and date-bounded retrieval from external
//!   document subsystems with dual-threshold tolerance
//! - **Similarity scoring**: ranked, explainable suggestions weighted by
//!   amount, date, and counterparty-name proximity per category
//! - **Settlement projection**: business-day projection of POS batch credit
//!   dates over a configurable holiday calendar
//! - **State machine**: idempotent confirm/ignore/reset lifecycle with
//!   append-only history and per-category auto-confirm policies
//! - **Source abstraction**: backend-agnostic design with a trait-based
//!   document query interface
//!
//! ## Quick Start
//!
//! ```rust
//! use reconcile_core::{EngineConfig, ReconciliationEngine, MemoryDocumentSource};
//!
//! let source = MemoryDocumentSource::new();
//! let engine = ReconciliationEngine::new(source, EngineConfig::default()).unwrap();
//! // engine.analyze(transactions).await drives the whole pipeline
//! ```

pub mod calendar;
pub mod classify;
pub mod config;
pub mod engine;
pub mod matching;
pub mod policy;
pub mod settlement;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use calendar::BusinessCalendar;
pub use classify::{Classification, Classifier, ClassifierRule};
pub use config::EngineConfig;
pub use engine::{AnalysisIssue, AnalysisOutcome, BulkOutcome, BulkResult, ReconciliationEngine};
pub use matching::{name_similarity, CandidateFinder, Scorer};
pub use policy::{AutoConfirmPolicy, AutoConfirmRule};
pub use settlement::SettlementProjector;
pub use traits::{CandidateQuery, DocumentSource};
pub use types::*;
pub use utils::MemoryDocumentSource;
