//! Reconciliation engine: batch analysis and the transaction state machine
//!
//! The engine owns the authoritative transaction store and the
//! `pending → suggested → {confirmed, ignored}` lifecycle. Analysis runs the
//! classify→find→score pipeline concurrently across transactions; the state
//! machine serializes confirm/ignore/reset per transaction id so idempotency
//! and the no-silent-overwrite rule hold under concurrent callers.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{Mutex as IdMutex, Semaphore};
use uuid::Uuid;

use crate::calendar::BusinessCalendar;
use crate::classify::{Classification, Classifier};
use crate::config::EngineConfig;
use crate::matching::{CandidateFinder, Scorer};
use crate::policy::AutoConfirmPolicy;
use crate::settlement::SettlementProjector;
use crate::traits::DocumentSource;
use crate::types::{
    BankTransaction, Category, ConfirmMode, HistoryEntry, MatchSuggestion, ReconcileError,
    ReconcileResult, ReconciliationRecord, TransactionState,
};

/// Per-transaction problem surfaced by an analysis pass.
///
/// Issues are reported alongside successes, never aborting the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisIssue {
    /// The candidate query exceeded its timeout; the transaction degrades
    /// to an empty suggestion list
    CandidateQueryTimeout,
    /// The document source returned an error
    CandidateQueryFailed { reason: String },
    /// Settlement projection ran off its holiday correction bound; fatal
    /// for this transaction, which stays pending
    SettlementProjectionFailed { reason: String },
    /// An analysis worker failed unexpectedly
    Internal { reason: String },
}

/// Result of analyzing one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    /// The transaction after analysis (category and state updated)
    pub transaction: BankTransaction,
    /// Ranked suggestions, best first
    pub suggestions: Vec<MatchSuggestion>,
    /// Problem encountered for this transaction, if any
    pub issue: Option<AnalysisIssue>,
}

/// Result of one item within a bulk confirm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub transaction_id: String,
    pub outcome: BulkResult,
}

/// Per-item bulk confirm outcome; failures never roll back other items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkResult {
    Confirmed(ReconciliationRecord),
    Failed { reason: String },
}

/// The classify→find→score pipeline shared by analysis workers
struct Pipeline {
    classifier: Classifier,
    finder: CandidateFinder,
    scorer: Scorer,
    projector: SettlementProjector,
    config: Arc<EngineConfig>,
}

struct PipelineOutput {
    classification: Classification,
    suggestions: Vec<MatchSuggestion>,
    issue: Option<AnalysisIssue>,
    /// Fatal outputs leave the transaction pending instead of suggested
    fatal: bool,
}

impl Pipeline {
    async fn run(
        &self,
        transaction: &BankTransaction,
        source: &dyn DocumentSource,
    ) -> PipelineOutput {
        let classification = self.classifier.classify(transaction);

        let (candidates, issue) = match tokio::time::timeout(
            self.config.query_timeout,
            self.finder
                .find(transaction, classification.category, source),
        )
        .await
        {
            Ok(Ok(candidates)) => (candidates, None),
            Ok(Err(error)) => (
                Vec::new(),
                Some(AnalysisIssue::CandidateQueryFailed {
                    reason: error.to_string(),
                }),
            ),
            Err(_) => (Vec::new(), Some(AnalysisIssue::CandidateQueryTimeout)),
        };

        match self
            .scorer
            .score(transaction, &classification, candidates, &self.projector)
        {
            Ok(suggestions) => PipelineOutput {
                classification,
                suggestions,
                issue,
                fatal: false,
            },
            Err(error) => PipelineOutput {
                classification,
                suggestions: Vec::new(),
                issue: Some(AnalysisIssue::SettlementProjectionFailed {
                    reason: error.to_string(),
                }),
                fatal: true,
            },
        }
    }
}

/// Authoritative engine state behind one lock.
///
/// Suggestions live here so the presentation layer can never feed stale
/// client-side suggestions back into a confirm.
#[derive(Debug, Default)]
struct EngineStore {
    transactions: HashMap<String, BankTransaction>,
    /// Insertion order, for deterministic listing and bulk iteration
    order: Vec<String>,
    suggestions: HashMap<String, Vec<MatchSuggestion>>,
    /// Current confirmation per transaction, if any
    active_records: HashMap<String, ReconciliationRecord>,
    /// Append-only confirmation/tombstone log
    history: Vec<HistoryEntry>,
}

impl EngineStore {
    fn upsert(&mut self, transaction: BankTransaction) {
        if !self.transactions.contains_key(&transaction.id) {
            self.order.push(transaction.id.clone());
        }
        self.transactions
            .insert(transaction.id.clone(), transaction);
    }
}

/// Reconciliation engine over an external document source
pub struct ReconciliationEngine<S: DocumentSource + 'static> {
    source: Arc<S>,
    config: Arc<EngineConfig>,
    pipeline: Arc<Pipeline>,
    policy: AutoConfirmPolicy,
    store: Arc<RwLock<EngineStore>>,
    id_locks: Arc<Mutex<HashMap<String, Arc<IdMutex<()>>>>>,
}

impl<S: DocumentSource + 'static> ReconciliationEngine<S> {
    /// Create an engine with the default classifier rule set
    pub fn new(source: S, config: EngineConfig) -> ReconcileResult<Self> {
        Self::with_classifier(source, config, Classifier::default())
    }

    /// Create an engine with a custom classifier
    pub fn with_classifier(
        source: S,
        config: EngineConfig,
        classifier: Classifier,
    ) -> ReconcileResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let calendar = BusinessCalendar::new(&config.holidays);
        let pipeline = Pipeline {
            classifier,
            finder: CandidateFinder::new(config.clone()),
            scorer: Scorer::new(config.clone()),
            projector: SettlementProjector::new(calendar, config.settlement_lag_days),
            config: config.clone(),
        };
        Ok(Self {
            source: Arc::new(source),
            policy: AutoConfirmPolicy::from_config(&config),
            config,
            pipeline: Arc::new(pipeline),
            store: Arc::new(RwLock::new(EngineStore::default())),
            id_locks: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Analyze a batch of transactions: classify, retrieve candidates, and
    /// score them into ranked suggestions.
    ///
    /// Each transaction's pipeline runs independently on a worker pool;
    /// results are merged in input order. Per-transaction failures are
    /// reported in the outcome, never aborting the batch; only malformed
    /// input rejects the whole call up front. Re-entrant: re-analyzing a
    /// pending or suggested transaction recomputes its suggestions, while
    /// confirmed and ignored transactions are returned untouched. Analysis
    /// never confirms; applying suggestions is [`confirm`](Self::confirm) or
    /// [`confirm_bulk`](Self::confirm_bulk) territory.
    pub async fn analyze(
        &self,
        transactions: Vec<BankTransaction>,
    ) -> ReconcileResult<Vec<AnalysisOutcome>> {
        validate_batch(&transactions)?;

        // Transactions already resolved keep their attribution
        let mut resolved: HashMap<String, (BankTransaction, Vec<MatchSuggestion>)> = {
            let store = self.store.read().unwrap();
            transactions
                .iter()
                .filter_map(|tx| {
                    let existing = store.transactions.get(&tx.id)?;
                    if matches!(
                        existing.state,
                        TransactionState::Confirmed | TransactionState::Ignored
                    ) {
                        let suggestions =
                            store.suggestions.get(&tx.id).cloned().unwrap_or_default();
                        Some((tx.id.clone(), (existing.clone(), suggestions)))
                    } else {
                        None
                    }
                })
                .collect()
        };

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut handles = Vec::with_capacity(transactions.len());
        for transaction in &transactions {
            if resolved.contains_key(&transaction.id) {
                handles.push(None);
                continue;
            }
            let semaphore = semaphore.clone();
            let pipeline = self.pipeline.clone();
            let source = self.source.clone();
            let transaction = transaction.clone();
            handles.push(Some(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                pipeline.run(&transaction, source.as_ref()).await
            })));
        }

        let mut outcomes = Vec::with_capacity(transactions.len());
        for (transaction, handle) in transactions.into_iter().zip(handles) {
            let outcome = match handle {
                None => match resolved.remove(&transaction.id) {
                    Some((existing, suggestions)) => AnalysisOutcome {
                        transaction: existing,
                        suggestions,
                        issue: None,
                    },
                    None => AnalysisOutcome {
                        transaction,
                        suggestions: Vec::new(),
                        issue: None,
                    },
                },
                Some(handle) => {
                    let output = match handle.await {
                        Ok(output) => output,
                        Err(error) => PipelineOutput {
                            classification: Classification {
                                category: transaction.category,
                                counterparty: None,
                            },
                            suggestions: Vec::new(),
                            issue: Some(AnalysisIssue::Internal {
                                reason: error.to_string(),
                            }),
                            fatal: true,
                        },
                    };
                    self.apply_analysis(transaction, output)
                }
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Store one pipeline result.
    ///
    /// The store write happens once per transaction, after its pipeline has
    /// fully completed, so cancelling an in-flight batch leaves every
    /// already-processed transaction consistently suggested.
    fn apply_analysis(
        &self,
        mut transaction: BankTransaction,
        output: PipelineOutput,
    ) -> AnalysisOutcome {
        transaction.category = output.classification.category;
        transaction.matched_document = None;
        transaction.state = if output.fatal {
            TransactionState::Pending
        } else {
            TransactionState::Suggested
        };

        {
            let mut store = self.store.write().unwrap();
            store.upsert(transaction.clone());
            if output.fatal {
                store.suggestions.remove(&transaction.id);
            } else {
                store
                    .suggestions
                    .insert(transaction.id.clone(), output.suggestions.clone());
            }
        }

        AnalysisOutcome {
            transaction,
            suggestions: output.suggestions,
            issue: output.issue,
        }
    }

    /// Confirm a suggested transaction against a candidate document, or
    /// against no document for categories that allow it.
    ///
    /// Idempotent: confirming an already-confirmed transaction with the same
    /// candidate returns the existing record and changes nothing. Confirming
    /// with a different candidate is rejected until an explicit reset.
    pub async fn confirm(
        &self,
        transaction_id: &str,
        candidate_id: Option<&str>,
    ) -> ReconcileResult<ReconciliationRecord> {
        self.confirm_with_mode(transaction_id, candidate_id, ConfirmMode::Manual)
            .await
    }

    async fn confirm_with_mode(
        &self,
        transaction_id: &str,
        candidate_id: Option<&str>,
        mode: ConfirmMode,
    ) -> ReconcileResult<ReconciliationRecord> {
        let id_lock = self.id_lock(transaction_id);
        let _guard = id_lock.lock().await;

        let mut store = self.store.write().unwrap();
        let (state, category, matched_document) = match store.transactions.get(transaction_id) {
            Some(tx) => (tx.state, tx.category, tx.matched_document.clone()),
            None => {
                return Err(ReconcileError::TransactionNotFound(
                    transaction_id.to_string(),
                ))
            }
        };

        match state {
            TransactionState::Confirmed => {
                let requested = candidate_id.map(String::from);
                if matched_document == requested {
                    store
                        .active_records
                        .get(transaction_id)
                        .cloned()
                        .ok_or_else(|| {
                            ReconcileError::InvalidTransaction(format!(
                                "No active record for confirmed transaction '{}'",
                                transaction_id
                            ))
                        })
                } else {
                    Err(ReconcileError::StaleConfirmConflict {
                        transaction_id: transaction_id.to_string(),
                        confirmed: matched_document,
                        requested,
                    })
                }
            }
            TransactionState::Suggested => {
                match candidate_id {
                    Some(candidate_id) => {
                        let known = store
                            .suggestions
                            .get(transaction_id)
                            .map(|suggestions| {
                                suggestions
                                    .iter()
                                    .any(|s| s.candidate.document_id == candidate_id)
                            })
                            .unwrap_or(false);
                        if !known {
                            return Err(ReconcileError::UnknownCandidate {
                                transaction_id: transaction_id.to_string(),
                                candidate_id: candidate_id.to_string(),
                            });
                        }
                    }
                    None => {
                        if !category.allows_no_document_confirm() {
                            return Err(ReconcileError::DocumentRequired {
                                transaction_id: transaction_id.to_string(),
                                category,
                            });
                        }
                    }
                }

                let record = ReconciliationRecord {
                    record_id: Uuid::new_v4(),
                    transaction_id: transaction_id.to_string(),
                    document_id: candidate_id.map(String::from),
                    confirmed_at: Utc::now().naive_utc(),
                    mode,
                };

                if let Some(tx) = store.transactions.get_mut(transaction_id) {
                    tx.state = TransactionState::Confirmed;
                    tx.matched_document = candidate_id.map(String::from);
                }
                store
                    .history
                    .push(HistoryEntry::Confirmation(record.clone()));
                store
                    .active_records
                    .insert(transaction_id.to_string(), record.clone());

                Ok(record)
            }
            state => Err(ReconcileError::IllegalTransition {
                transaction_id: transaction_id.to_string(),
                state,
                action: "confirm",
            }),
        }
    }

    /// Set a suggested transaction aside. Terminal until reset; ignoring an
    /// already-ignored transaction is a no-op.
    pub async fn ignore(&self, transaction_id: &str) -> ReconcileResult<()> {
        let id_lock = self.id_lock(transaction_id);
        let _guard = id_lock.lock().await;

        let mut store = self.store.write().unwrap();
        let state = store
            .transactions
            .get(transaction_id)
            .map(|tx| tx.state)
            .ok_or_else(|| ReconcileError::TransactionNotFound(transaction_id.to_string()))?;

        match state {
            TransactionState::Suggested => {
                if let Some(tx) = store.transactions.get_mut(transaction_id) {
                    tx.state = TransactionState::Ignored;
                }
                Ok(())
            }
            TransactionState::Ignored => Ok(()),
            state => Err(ReconcileError::IllegalTransition {
                transaction_id: transaction_id.to_string(),
                state,
                action: "ignore",
            }),
        }
    }

    /// Return a confirmed or ignored transaction to pending. Appends a
    /// tombstone to history and clears the matched document; the original
    /// confirmation record is never rewritten.
    pub async fn reset(&self, transaction_id: &str) -> ReconcileResult<()> {
        let id_lock = self.id_lock(transaction_id);
        let _guard = id_lock.lock().await;

        let mut store = self.store.write().unwrap();
        let state = store
            .transactions
            .get(transaction_id)
            .map(|tx| tx.state)
            .ok_or_else(|| ReconcileError::TransactionNotFound(transaction_id.to_string()))?;

        match state {
            TransactionState::Confirmed | TransactionState::Ignored => {
                if let Some(tx) = store.transactions.get_mut(transaction_id) {
                    tx.state = TransactionState::Pending;
                    tx.matched_document = None;
                }
                store.suggestions.remove(transaction_id);
                store.active_records.remove(transaction_id);
                store.history.push(HistoryEntry::Tombstone {
                    transaction_id: transaction_id.to_string(),
                    reset_at: Utc::now().naive_utc(),
                });
                Ok(())
            }
            state => Err(ReconcileError::IllegalTransition {
                transaction_id: transaction_id.to_string(),
                state,
                action: "reset",
            }),
        }
    }

    /// Apply the auto-confirm policy to every suggested transaction of a
    /// category.
    ///
    /// Best-effort per item: each transition is independent, failures are
    /// reported individually, and nothing is rolled back. Transactions the
    /// policy keeps manual (or that have no suggestion to apply) are
    /// reported as failed, not skipped silently.
    pub async fn confirm_bulk(&self, category: Category) -> Vec<BulkOutcome> {
        let selected: Vec<(String, Option<String>, bool)> = {
            let store = self.store.read().unwrap();
            store
                .order
                .iter()
                .filter_map(|id| {
                    let tx = store.transactions.get(id)?;
                    if tx.category != category || tx.state != TransactionState::Suggested {
                        return None;
                    }
                    let suggestions = store.suggestions.get(id).cloned().unwrap_or_default();
                    let eligible = self.policy.should_auto_confirm(category, &suggestions);
                    let top = suggestions
                        .first()
                        .map(|s| s.candidate.document_id.clone());
                    Some((id.clone(), top, eligible))
                })
                .collect()
        };

        let mut outcomes = Vec::with_capacity(selected.len());
        for (transaction_id, top, eligible) in selected {
            let outcome = if !eligible {
                let reason = if top.is_none() {
                    "no suggestion available to confirm".to_string()
                } else {
                    "auto-confirm policy requires manual confirmation".to_string()
                };
                BulkResult::Failed { reason }
            } else {
                match self
                    .confirm_with_mode(&transaction_id, top.as_deref(), ConfirmMode::Auto)
                    .await
                {
                    Ok(record) => BulkResult::Confirmed(record),
                    Err(error) => BulkResult::Failed {
                        reason: error.to_string(),
                    },
                }
            };
            outcomes.push(BulkOutcome {
                transaction_id,
                outcome,
            });
        }
        outcomes
    }

    /// Get a transaction by id
    pub fn transaction(&self, transaction_id: &str) -> Option<BankTransaction> {
        self.store
            .read()
            .unwrap()
            .transactions
            .get(transaction_id)
            .cloned()
    }

    /// All known transactions, in insertion order
    pub fn transactions(&self) -> Vec<BankTransaction> {
        let store = self.store.read().unwrap();
        store
            .order
            .iter()
            .filter_map(|id| store.transactions.get(id).cloned())
            .collect()
    }

    /// Current suggestions for a transaction
    pub fn suggestions(&self, transaction_id: &str) -> Vec<MatchSuggestion> {
        self.store
            .read()
            .unwrap()
            .suggestions
            .get(transaction_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Confirmation and tombstone history for a transaction, oldest first
    pub fn history(&self, transaction_id: &str) -> Vec<HistoryEntry> {
        self.store
            .read()
            .unwrap()
            .history
            .iter()
            .filter(|entry| entry.transaction_id() == transaction_id)
            .cloned()
            .collect()
    }

    fn id_lock(&self, transaction_id: &str) -> Arc<IdMutex<()>> {
        let mut locks = self.id_locks.lock().unwrap();
        locks
            .entry(transaction_id.to_string())
            .or_insert_with(|| Arc::new(IdMutex::new(())))
            .clone()
    }
}

/// Reject malformed input before any processing begins
fn validate_batch(transactions: &[BankTransaction]) -> ReconcileResult<()> {
    let mut seen = HashSet::new();
    for transaction in transactions {
        if transaction.id.trim().is_empty() {
            return Err(ReconcileError::InvalidTransaction(
                "Transaction id cannot be empty".to_string(),
            ));
        }
        if !seen.insert(&transaction.id) {
            return Err(ReconcileError::InvalidTransaction(format!(
                "Duplicate transaction id '{}' in batch",
                transaction.id
            )));
        }
        if transaction.amount < bigdecimal::BigDecimal::from(0) {
            return Err(ReconcileError::InvalidTransaction(format!(
                "Transaction '{}' has a negative amount; direction encodes the sign",
                transaction.id
            )));
        }
    }
    Ok(())
}
