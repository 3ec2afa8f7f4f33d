// ============================================================================
// Transactor Library
// ============================================================================
//
// Typed, auditable transactions against arbitrary target records, executed
// through pluggable transactors that bind (and when asked, create) the
// fields they need on both the transaction and the target record.
//
// ============================================================================

pub mod auth;
pub mod config;
pub mod core;
pub mod engine;
pub mod field;
pub mod schema;
pub mod storage;
pub mod transaction;
pub mod transactor;

// Re-export main types for convenience
pub use auth::Actor;
pub use config::TransactorConfig;
pub use core::{
    ConfigurationError, ConfigurationErrorKind, EntityRef, FieldValue, RecordId, Result, Text,
    TransactorError,
};
pub use engine::{ExecutionEngine, ExecutionOutcome, RejectionReason};
pub use storage::{MemoryBackend, Record};
pub use transaction::{Transaction, TransactionStatus, TransactionType, TransactionTypeManager};
pub use transactor::{
    ConfigurationSchema, ConfigurationSubmission, GenericTransactor, Transactor, TransactorBase,
    TransactorDefinition, TransactorRegistry, TransactorServices,
};
