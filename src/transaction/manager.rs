use super::TransactionType;
use crate::core::{Result, TransactorError};
use crate::storage::TransactionTypeStore;
use crate::transactor::{ConfigurationSchema, ConfigurationSubmission, TransactorRegistry};
use std::sync::Arc;
use tracing::{Level, event};

/// Administrative operations on transaction types.
#[derive(Clone)]
pub struct TransactionTypeManager {
    types: Arc<dyn TransactionTypeStore>,
    registry: Arc<TransactorRegistry>,
}

impl TransactionTypeManager {
    pub fn new(types: Arc<dyn TransactionTypeStore>, registry: Arc<TransactorRegistry>) -> Self {
        Self { types, registry }
    }

    pub async fn load(&self, id: &str) -> Result<TransactionType> {
        self.types
            .load(id)
            .await?
            .ok_or_else(|| TransactorError::TransactionTypeNotFound(id.to_string()))
    }

    pub async fn save(&self, transaction_type: &TransactionType) -> Result<()> {
        self.types.save(transaction_type).await?;
        event!(Level::INFO, transaction_type = %transaction_type.id(), "transaction type saved");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<TransactionType>> {
        self.types.list().await
    }

    /// Bind `transactor_id`, dropping the previous settings, and persist.
    pub async fn set_transactor(
        &self,
        transaction_type: &mut TransactionType,
        transactor_id: &str,
    ) -> Result<()> {
        if self.registry.definition(transactor_id).is_none() {
            return Err(TransactorError::UnknownTransactor(transactor_id.to_string()));
        }
        transaction_type.set_plugin_id(transactor_id);
        self.save(transaction_type).await
    }

    /// Configuration schema of the transactor bound to `transaction_type`.
    pub async fn configuration_schema(
        &self,
        transaction_type: &TransactionType,
    ) -> Result<ConfigurationSchema> {
        let transactor = self.registry.for_type(transaction_type)?;
        transactor.build_configuration_schema().await
    }

    /// Apply `submission` and persist the type. On
    /// `TransactorError::InvalidConfiguration` nothing is stored.
    pub async fn apply_configuration(
        &self,
        transaction_type: &mut TransactionType,
        schema: &ConfigurationSchema,
        submission: &ConfigurationSubmission,
    ) -> Result<()> {
        let transactor = self.registry.for_type(transaction_type)?;
        let mut updated = transaction_type.clone();
        transactor
            .submit_configuration(schema, submission, &mut updated)
            .await?;
        self.save(&updated).await?;
        *transaction_type = updated;
        Ok(())
    }
}
