// ============================================================================
// Transaction Execution Engine
// ============================================================================
//
// Entry point for running transactions:
//
//   pending (in memory and in storage)? ─no─▶ Rejected(AlreadyExecuted)
//      │
//   validate ─false─▶ Rejected(ValidationFailed)
//      │
//   persist if new, look up last executed of (type, target)
//      │
//   execute ─false─▶ Rejected(ExecutionDeclined), transaction restored
//      │
//   mark executed, save (compare-and-swap) ─▶ Executed
//
// Serialization of competing executions is left to the transaction storage.
//
// ============================================================================

use crate::core::{EntityRef, RecordId, Result, Text, TransactorError};
use crate::storage::{TransactionStorage, TransactionTypeStore};
use crate::transaction::{Transaction, TransactionType};
use crate::transactor::{Transactor, TransactorRegistry};
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

/// Why an execution did not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// The transactor found the transaction not executable
    ValidationFailed,
    /// The transactor ran and decided not to apply
    ExecutionDeclined,
    /// The transaction was executed before
    AlreadyExecuted,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            RejectionReason::ValidationFailed => "validation failed",
            RejectionReason::ExecutionDeclined => "execution declined",
            RejectionReason::AlreadyExecuted => "already executed",
        };
        write!(f, "{}", reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "reason")]
pub enum ExecutionOutcome {
    Executed,
    Rejected(RejectionReason),
}

impl ExecutionOutcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, ExecutionOutcome::Executed)
    }

    pub fn rejection(&self) -> Option<RejectionReason> {
        match self {
            ExecutionOutcome::Rejected(reason) => Some(*reason),
            ExecutionOutcome::Executed => None,
        }
    }
}

/// Runs transactions through the transactor bound to their type.
#[derive(Clone)]
pub struct ExecutionEngine {
    types: Arc<dyn TransactionTypeStore>,
    transactions: Arc<dyn TransactionStorage>,
    registry: Arc<TransactorRegistry>,
}

impl ExecutionEngine {
    pub fn new(
        types: Arc<dyn TransactionTypeStore>,
        transactions: Arc<dyn TransactionStorage>,
        registry: Arc<TransactorRegistry>,
    ) -> Self {
        Self {
            types,
            transactions,
            registry,
        }
    }

    pub fn registry(&self) -> &TransactorRegistry {
        &self.registry
    }

    /// New pending transaction of `type_id` against record `target_id` of
    /// the type's target record type. Nothing is persisted.
    pub async fn create(&self, type_id: &str, target_id: RecordId) -> Result<Transaction> {
        let transaction_type = self.load_type(type_id).await?;
        let target = EntityRef::new(transaction_type.target_entity_type(), target_id);
        self.transactions.create(type_id, target).await
    }

    /// Validate and execute `transaction`.
    ///
    /// Rejections are outcomes, not errors. Errors are reserved for storage
    /// faults, unknown types and unknown transactors.
    pub async fn execute(&self, transaction: &mut Transaction) -> Result<ExecutionOutcome> {
        let span = info_span!(
            "transaction.execute",
            transaction_type = %transaction.type_id(),
            id = ?transaction.id()
        );

        async {
            if !transaction.is_pending() {
                event!(Level::WARN, "transaction already executed");
                return Ok(ExecutionOutcome::Rejected(RejectionReason::AlreadyExecuted));
            }

            if self.executed_in_storage(transaction).await? {
                event!(Level::WARN, "stored transaction already executed");
                return Ok(ExecutionOutcome::Rejected(RejectionReason::AlreadyExecuted));
            }

            let transactor = self.transactor_for(transaction).await?;

            if !transactor.validate_transaction(transaction).await? {
                event!(Level::INFO, "transaction failed validation");
                return Ok(ExecutionOutcome::Rejected(RejectionReason::ValidationFailed));
            }

            if transaction.is_new() {
                self.transactions.save(transaction).await?;
                event!(Level::DEBUG, id = ?transaction.id(), "transaction persisted");
            }

            let last_executed = match transaction.target() {
                Some(target) => {
                    self.transactions
                        .find_most_recent_executed(transaction.type_id(), target)
                        .await?
                }
                None => None,
            };

            let snapshot = transaction.clone();
            if !transactor
                .execute_transaction(transaction, last_executed.as_ref())
                .await?
            {
                *transaction = snapshot;
                event!(Level::INFO, "transactor declined execution");
                return Ok(ExecutionOutcome::Rejected(RejectionReason::ExecutionDeclined));
            }

            transaction.mark_executed(Utc::now());
            self.transactions.save(transaction).await?;

            event!(
                Level::INFO,
                id = ?transaction.id(),
                last_executed = ?last_executed.as_ref().and_then(Transaction::id),
                "transaction executed"
            );
            Ok(ExecutionOutcome::Executed)
        }
        .instrument(span)
        .await
    }

    /// Load `id` and execute it
    pub async fn execute_by_id(&self, id: RecordId) -> Result<ExecutionOutcome> {
        let mut transaction = self
            .transactions
            .load(id)
            .await?
            .ok_or(TransactorError::TransactionNotFound(id))?;
        self.execute(&mut transaction).await
    }

    pub async fn describe(
        &self,
        transaction: &Transaction,
        langcode: Option<&str>,
    ) -> Result<Text> {
        let transactor = self.transactor_for(transaction).await?;
        Ok(transactor.transaction_description(transaction, langcode))
    }

    pub async fn details(
        &self,
        transaction: &Transaction,
        langcode: Option<&str>,
    ) -> Result<Vec<Text>> {
        let transactor = self.transactor_for(transaction).await?;
        transactor.transaction_details(transaction, langcode).await
    }

    pub async fn execution_indications(
        &self,
        transaction: &Transaction,
        langcode: Option<&str>,
    ) -> Result<Text> {
        let transactor = self.transactor_for(transaction).await?;
        transactor.execution_indications(transaction, langcode).await
    }

    /// The caller's copy may be stale; the stored row decides.
    async fn executed_in_storage(&self, transaction: &Transaction) -> Result<bool> {
        let Some(id) = transaction.id() else {
            return Ok(false);
        };
        let stored = self.transactions.load(id).await?;
        Ok(stored.is_some_and(|stored| stored.status().is_terminal()))
    }

    async fn load_type(&self, type_id: &str) -> Result<TransactionType> {
        self.types
            .load(type_id)
            .await?
            .ok_or_else(|| TransactorError::TransactionTypeNotFound(type_id.to_string()))
    }

    async fn transactor_for(&self, transaction: &Transaction) -> Result<Box<dyn Transactor>> {
        let transaction_type = self.load_type(transaction.type_id()).await?;
        self.registry.for_type(&transaction_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        assert!(ExecutionOutcome::Executed.is_executed());
        assert_eq!(ExecutionOutcome::Executed.rejection(), None);

        let rejected = ExecutionOutcome::Rejected(RejectionReason::AlreadyExecuted);
        assert!(!rejected.is_executed());
        assert_eq!(rejected.rejection(), Some(RejectionReason::AlreadyExecuted));
        assert_eq!(RejectionReason::ExecutionDeclined.to_string(), "execution declined");
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(ExecutionOutcome::Rejected(
            RejectionReason::ValidationFailed,
        ))
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"outcome": "rejected", "reason": "validation_failed"})
        );
    }
}
