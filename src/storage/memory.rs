use super::{Record, RecordStorage, TransactionStorage, TransactionTypeStore};
use crate::auth::Actor;
use crate::config::TransactorConfig;
use crate::core::{EntityRef, RecordId, Result, TransactorError};
use crate::schema::{MemoryBundleInfo, MemoryDisplayRepository, MemoryFieldManager};
use crate::transaction::{Transaction, TransactionType};
use crate::transactor::TransactorServices;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Target records keyed by (entity type, id).
#[derive(Default)]
pub struct MemoryRecordStorage {
    records: RwLock<HashMap<(String, RecordId), Record>>,
}

impl MemoryRecordStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl RecordStorage for MemoryRecordStorage {
    async fn load(&self, entity_type: &str, id: RecordId) -> Result<Option<Record>> {
        let records = self.records.read().await;
        Ok(records.get(&(entity_type.to_string(), id)).cloned())
    }

    async fn save(&self, record: &Record) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert((record.entity_type.clone(), record.id), record.clone());
        Ok(())
    }
}

struct TransactionTable {
    rows: BTreeMap<RecordId, Transaction>,
    next_id: RecordId,
}

/// Transaction records held in memory.
///
/// Saving is a compare-and-swap on the status: a transaction already stored
/// as executed can not be saved again, which serializes competing executions
/// of the same transaction.
pub struct MemoryTransactionStorage {
    table: RwLock<TransactionTable>,
}

impl Default for MemoryTransactionStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransactionStorage {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(TransactionTable {
                rows: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }
}

#[async_trait]
impl TransactionStorage for MemoryTransactionStorage {
    async fn create(&self, type_id: &str, target: EntityRef) -> Result<Transaction> {
        Ok(Transaction::new(type_id, Some(target)))
    }

    async fn save(&self, transaction: &mut Transaction) -> Result<()> {
        let mut table = self.table.write().await;

        let id = match transaction.id() {
            Some(id) => {
                if let Some(stored) = table.rows.get(&id) {
                    if stored.status().is_terminal() {
                        return Err(TransactorError::Conflict(format!(
                            "transaction #{} is already executed",
                            id
                        )));
                    }
                }
                id
            }
            None => {
                let id = table.next_id;
                transaction.assign_id(id);
                id
            }
        };

        table.next_id = table.next_id.max(id + 1);
        table.rows.insert(id, transaction.clone());
        Ok(())
    }

    async fn load(&self, id: RecordId) -> Result<Option<Transaction>> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn find_most_recent_executed(
        &self,
        type_id: &str,
        target: &EntityRef,
    ) -> Result<Option<Transaction>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|t| t.type_id() == type_id && t.target() == Some(target))
            .filter(|t| t.status().is_terminal())
            .max_by_key(|t| (t.executed_at(), t.id()))
            .cloned())
    }
}

/// Transaction types held in memory.
#[derive(Default)]
pub struct MemoryTransactionTypeStore {
    types: RwLock<BTreeMap<String, TransactionType>>,
}

impl MemoryTransactionTypeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionTypeStore for MemoryTransactionTypeStore {
    async fn load(&self, id: &str) -> Result<Option<TransactionType>> {
        let types = self.types.read().await;
        Ok(types.get(id).cloned())
    }

    async fn save(&self, transaction_type: &TransactionType) -> Result<()> {
        let mut stored = transaction_type.clone();
        stored.pre_save();
        let mut types = self.types.write().await;
        types.insert(stored.id().to_string(), stored);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<TransactionType>> {
        let types = self.types.read().await;
        Ok(types.values().cloned().collect())
    }
}

/// Every collaborator in memory, with concrete handles kept for inspection.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    pub records: Arc<MemoryRecordStorage>,
    pub transactions: Arc<MemoryTransactionStorage>,
    pub types: Arc<MemoryTransactionTypeStore>,
    pub fields: Arc<MemoryFieldManager>,
    pub bundles: Arc<MemoryBundleInfo>,
    pub displays: Arc<MemoryDisplayRepository>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Services handed to transactor plugins, acting as `actor`.
    pub fn services(&self, actor: Actor, config: TransactorConfig) -> TransactorServices {
        TransactorServices {
            records: self.records.clone(),
            transactions: self.transactions.clone(),
            fields: self.fields.clone(),
            bundles: self.bundles.clone(),
            displays: self.displays.clone(),
            actor,
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_save_assigns_increasing_ids() {
        let storage = MemoryTransactionStorage::new();
        let target = EntityRef::new("inventory_item", 42);

        let mut a = storage.create("restock", target.clone()).await.unwrap();
        let mut b = storage.create("restock", target).await.unwrap();
        storage.save(&mut a).await.unwrap();
        storage.save(&mut b).await.unwrap();

        assert_eq!(a.id(), Some(1));
        assert_eq!(b.id(), Some(2));
        assert_eq!(storage.len().await, 2);
    }

    #[tokio::test]
    async fn test_saving_executed_twice_conflicts() {
        let storage = MemoryTransactionStorage::new();
        let mut txn = Transaction::new("restock", Some(EntityRef::new("inventory_item", 1)));
        storage.save(&mut txn).await.unwrap();

        txn.mark_executed(Utc::now());
        storage.save(&mut txn).await.unwrap();

        let err = storage.save(&mut txn).await.unwrap_err();
        assert!(matches!(err, TransactorError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_most_recent_executed_orders_by_time_then_id() {
        let storage = MemoryTransactionStorage::new();
        let target = EntityRef::new("inventory_item", 42);
        let now = Utc::now();

        let mut older = Transaction::new("restock", Some(target.clone()));
        storage.save(&mut older).await.unwrap();
        let mut tie_low = Transaction::new("restock", Some(target.clone()));
        storage.save(&mut tie_low).await.unwrap();
        let mut tie_high = Transaction::new("restock", Some(target.clone()));
        storage.save(&mut tie_high).await.unwrap();
        let mut pending = Transaction::new("restock", Some(target.clone()));
        storage.save(&mut pending).await.unwrap();
        let mut other_type = Transaction::new("sale", Some(target.clone()));
        storage.save(&mut other_type).await.unwrap();

        older.mark_executed(now - Duration::seconds(10));
        storage.save(&mut older).await.unwrap();
        tie_high.mark_executed(now);
        storage.save(&mut tie_high).await.unwrap();
        tie_low.mark_executed(now);
        storage.save(&mut tie_low).await.unwrap();
        other_type.mark_executed(now + Duration::seconds(10));
        storage.save(&mut other_type).await.unwrap();

        let last = storage
            .find_most_recent_executed("restock", &target)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(last.id(), tie_high.id());

        let none = storage
            .find_most_recent_executed("restock", &EntityRef::new("inventory_item", 7))
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_type_store_sanitizes_on_save() {
        let store = MemoryTransactionTypeStore::new();
        let ty: TransactionType = serde_json::from_value(serde_json::json!({
            "id": "restock",
            "target_entity_type": "inventory_item",
        }))
        .unwrap();
        store.save(&ty).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
        assert!(store.load("restock").await.unwrap().is_some());
        assert!(store.load("missing").await.unwrap().is_none());
    }
}
