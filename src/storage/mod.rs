pub mod engine;
pub mod memory;
pub mod record;

pub use engine::{RecordStorage, TransactionStorage, TransactionTypeStore};
pub use memory::{
    MemoryBackend, MemoryRecordStorage, MemoryTransactionStorage, MemoryTransactionTypeStore,
};
pub use record::Record;
