// ============================================================================
// Transactions and Transaction Types
// ============================================================================
//
// A transaction is an auditable, typed event against one target record.
// Its type binds the target record type, the transactor plugin and the
// plugin settings.
//
// Lifecycle of a transaction:
//
//   new-pending ──save──> persisted-pending ──execute──> executed (terminal)
//
// ============================================================================

pub mod manager;
pub mod state;
pub mod transaction_type;

pub use manager::TransactionTypeManager;
pub use state::{TRANSACTION_ENTITY_TYPE, Transaction, TransactionStatus};
pub use transaction_type::{TransactionType, TransactorBinding, sanitize_bundles};
