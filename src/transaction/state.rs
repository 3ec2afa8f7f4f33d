// ============================================================================
// Transaction Record
// ============================================================================

use crate::core::{EntityRef, FieldValue, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Entity type of transaction records; transaction types are its bundles.
pub const TRANSACTION_ENTITY_TYPE: &str = "transaction";

/// Execution status of a transaction
///
/// State transitions:
/// ```text
/// Pending ──execute──> Executed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Waiting to be executed
    #[default]
    Pending,

    /// Executed; the transaction is now history
    Executed,
}

impl TransactionStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, TransactionStatus::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Executed)
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "PENDING"),
            TransactionStatus::Executed => write!(f, "EXECUTED"),
        }
    }
}

/// A typed transaction against one target record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Absent until first persisted
    #[serde(default)]
    id: Option<RecordId>,

    /// Transaction type id, which is also the bundle of the record
    #[serde(rename = "type")]
    type_id: String,

    #[serde(default)]
    target: Option<EntityRef>,

    #[serde(default)]
    status: TransactionStatus,

    #[serde(default = "Utc::now")]
    created: DateTime<Utc>,

    #[serde(default)]
    executed_at: Option<DateTime<Utc>>,

    /// Extra fields bound per transactor
    #[serde(default)]
    fields: BTreeMap<String, FieldValue>,
}

impl Transaction {
    /// Create a new pending transaction
    pub fn new(type_id: impl Into<String>, target: Option<EntityRef>) -> Self {
        Self {
            id: None,
            type_id: type_id.into(),
            target,
            status: TransactionStatus::Pending,
            created: Utc::now(),
            executed_at: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    /// True until the transaction is persisted for the first time
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Give the transaction its identity. Meant for storage collaborators.
    pub fn assign_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn target(&self) -> Option<&EntityRef> {
        self.target.as_ref()
    }

    pub fn target_entity_id(&self) -> Option<RecordId> {
        self.target.as_ref().map(|t| t.id)
    }

    pub fn set_target(&mut self, target: EntityRef) {
        self.target = Some(target);
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status.is_pending()
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn executed_at(&self) -> Option<DateTime<Utc>> {
        self.executed_at
    }

    /// Flip to executed. Only the execution engine does this.
    pub(crate) fn mark_executed(&mut self, at: DateTime<Utc>) {
        self.status = TransactionStatus::Executed;
        self.executed_at = Some(at);
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Reference to this transaction, available once it has an id
    pub fn reference(&self) -> Option<EntityRef> {
        self.id.map(|id| EntityRef::new(TRANSACTION_ENTITY_TYPE, id))
    }
}
