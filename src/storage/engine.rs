use super::Record;
use crate::core::{EntityRef, RecordId, Result};
use crate::transaction::{Transaction, TransactionType};
use async_trait::async_trait;

/// Storage of target records - pluggable backend
#[async_trait]
pub trait RecordStorage: Send + Sync {
    async fn load(&self, entity_type: &str, id: RecordId) -> Result<Option<Record>>;

    /// Insert or replace a record
    async fn save(&self, record: &Record) -> Result<()>;
}

/// Storage of transaction records
///
/// Implementations must serialize execution per (type, target): persisting a
/// transaction as executed while the stored copy is already executed has to
/// fail with `Conflict` instead of overwriting history.
#[async_trait]
pub trait TransactionStorage: Send + Sync {
    /// Build a new pending transaction; nothing is persisted yet
    async fn create(&self, type_id: &str, target: EntityRef) -> Result<Transaction>;

    /// Persist, assigning an id to new transactions
    async fn save(&self, transaction: &mut Transaction) -> Result<()>;

    async fn load(&self, id: RecordId) -> Result<Option<Transaction>>;

    /// Most recently executed transaction of `type_id` against `target`,
    /// latest execution time first, highest id on ties.
    async fn find_most_recent_executed(
        &self,
        type_id: &str,
        target: &EntityRef,
    ) -> Result<Option<Transaction>>;
}

/// Storage of transaction type config entities
#[async_trait]
pub trait TransactionTypeStore: Send + Sync {
    async fn load(&self, id: &str) -> Result<Option<TransactionType>>;

    /// Persist after running `TransactionType::pre_save`
    async fn save(&self, transaction_type: &TransactionType) -> Result<()>;

    /// All types sorted by id
    async fn list(&self) -> Result<Vec<TransactionType>>;
}
