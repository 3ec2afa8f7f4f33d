// ============================================================================
// Transactors
// ============================================================================
//
// A transactor is the pluggable business logic behind a transaction type.
// It declares the fields it works with, validates and executes transactions
// and describes them for display.
//
//   TransactorRegistry ──resolve(id, type)──▶ Box<dyn Transactor>
//                                                │
//                           TransactorBase ◀─────┘ (shared defaults)
//
// ============================================================================

pub mod base;
pub mod configuration;
pub mod generic;
pub mod registry;
pub mod services;

pub use base::TransactorBase;
pub use configuration::{
    BindingChoice, ConfigurationGroup, ConfigurationSchema, ConfigurationSubmission,
    FieldBindingElement, GroupKind, NewFieldElement, OptionElement,
};
pub use generic::{GENERIC_TRANSACTOR, GenericTransactor};
pub use registry::{TransactorFactory, TransactorRegistry};
pub use services::TransactorServices;

use crate::core::{ConfigurationError, Result, Text};
use crate::field::FieldDeclaration;
use crate::transaction::{Transaction, TransactionType};
use async_trait::async_trait;
use serde::Serialize;

/// Static description of a transactor plugin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactorDefinition {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Fields the transactor needs on transactions
    pub transaction_fields: Vec<FieldDeclaration>,
    /// Fields the transactor needs on target records
    pub target_entity_fields: Vec<FieldDeclaration>,
}

impl TransactorDefinition {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            transaction_fields: Vec::new(),
            target_entity_fields: Vec::new(),
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn transaction_field(mut self, field: FieldDeclaration) -> Self {
        self.transaction_fields.push(field);
        self
    }

    pub fn target_entity_field(mut self, field: FieldDeclaration) -> Self {
        self.target_entity_fields.push(field);
        self
    }
}

/// Business logic of a transaction type.
///
/// Every method but `base` has a default built on [`TransactorBase`];
/// plugins override what they specialize.
#[async_trait]
pub trait Transactor: Send + Sync {
    fn base(&self) -> &TransactorBase;

    fn definition(&self) -> &TransactorDefinition {
        self.base().definition()
    }

    fn transaction_type(&self) -> &TransactionType {
        self.base().transaction_type()
    }

    /// Whether `transaction` may be executed now.
    async fn validate_transaction(&self, transaction: &Transaction) -> Result<bool> {
        self.base().validate_transaction(transaction).await
    }

    /// Apply the transaction. `last_executed` is the most recent executed
    /// transaction of the same type and target, if any. Returning false
    /// declines the execution.
    async fn execute_transaction(
        &self,
        transaction: &mut Transaction,
        last_executed: Option<&Transaction>,
    ) -> Result<bool> {
        self.base()
            .execute_transaction(transaction, last_executed)
            .await
    }

    fn transaction_description(&self, transaction: &Transaction, langcode: Option<&str>) -> Text {
        self.base().transaction_description(transaction, langcode)
    }

    /// Extra lines shown next to the description.
    async fn transaction_details(
        &self,
        _transaction: &Transaction,
        _langcode: Option<&str>,
    ) -> Result<Vec<Text>> {
        Ok(Vec::new())
    }

    /// What executing the transaction will change.
    async fn execution_indications(
        &self,
        transaction: &Transaction,
        langcode: Option<&str>,
    ) -> Result<Text> {
        self.base()
            .execution_indications(transaction, langcode)
            .await
    }

    /// Free options offered next to the field bindings.
    fn configuration_options(&self) -> Vec<OptionElement> {
        Vec::new()
    }

    async fn build_configuration_schema(&self) -> Result<ConfigurationSchema> {
        self.base()
            .build_configuration_schema(self.configuration_options())
            .await
    }

    async fn validate_configuration(
        &self,
        schema: &ConfigurationSchema,
        submission: &ConfigurationSubmission,
    ) -> Result<Vec<ConfigurationError>> {
        self.base()
            .validate_configuration(schema, submission)
            .await
    }

    async fn submit_configuration(
        &self,
        schema: &ConfigurationSchema,
        submission: &ConfigurationSubmission,
        transaction_type: &mut TransactionType,
    ) -> Result<()> {
        self.base()
            .submit_configuration(schema, submission, transaction_type)
            .await
    }
}
