#![allow(dead_code)]

use std::sync::Arc;
use transactor::storage::RecordStorage;
use transactor::{
    Actor, ConfigurationSubmission, ExecutionEngine, MemoryBackend, Record, TransactionType,
    TransactionTypeManager, TransactorConfig, TransactorRegistry,
};

pub const ITEM: &str = "inventory_item";

/// In-memory world with a `widget` bundle of inventory items and item #42.
pub struct World {
    pub backend: MemoryBackend,
    pub registry: Arc<TransactorRegistry>,
    pub types: TransactionTypeManager,
    pub engine: ExecutionEngine,
}

impl World {
    pub async fn new() -> Self {
        Self::with_registry(|_| {}).await
    }

    /// World whose registry gets extra transactors from `setup`
    pub async fn with_registry(setup: impl FnOnce(&mut TransactorRegistry)) -> Self {
        Self::build(Actor::admin("admin"), setup).await
    }

    pub async fn build(actor: Actor, setup: impl FnOnce(&mut TransactorRegistry)) -> Self {
        let backend = MemoryBackend::new();
        backend.bundles.add_bundle(ITEM, "widget").await;
        backend
            .records
            .save(&Record::new(ITEM, "widget", 42, "Blue widget"))
            .await
            .unwrap();

        let mut registry = TransactorRegistry::with_default_transactors(
            backend.services(actor, TransactorConfig::default()),
        );
        setup(&mut registry);
        let registry = Arc::new(registry);

        let types = TransactionTypeManager::new(backend.types.clone(), registry.clone());
        let engine = ExecutionEngine::new(
            backend.types.clone(),
            backend.transactions.clone(),
            registry.clone(),
        );

        Self {
            backend,
            registry,
            types,
            engine,
        }
    }

    /// Type `id` on inventory items bound to `transactor_id`, configured with
    /// `submission`
    pub async fn configure_type(
        &self,
        id: &str,
        transactor_id: &str,
        submission: ConfigurationSubmission,
    ) -> TransactionType {
        let mut transaction_type = TransactionType::new(id, id, ITEM);
        self.types
            .set_transactor(&mut transaction_type, transactor_id)
            .await
            .unwrap();
        let schema = self.types.configuration_schema(&transaction_type).await.unwrap();
        self.types
            .apply_configuration(&mut transaction_type, &schema, &submission)
            .await
            .unwrap();
        transaction_type
    }

    /// The `restock` type of the generic transactor, recording the last
    /// transaction in a new `field_last_restock` field
    pub async fn restock_type(&self, transactor_id: &str) -> TransactionType {
        self.configure_type(
            "restock",
            transactor_id,
            ConfigurationSubmission::new().create_field(
                "last_transaction",
                "Last restock",
                "last_restock",
            ),
        )
        .await
    }

    pub async fn item(&self, id: u64) -> Record {
        self.backend.records.load(ITEM, id).await.unwrap().unwrap()
    }
}
