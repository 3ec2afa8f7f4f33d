// ============================================================================
// Record Schema Model
// ============================================================================
//
// Narrow view of the generic record/schema subsystem: field storages, their
// per-bundle attachments and the presentation configs new fields are enabled
// in. Services are traits so a real schema backend can stand behind them;
// the `memory` module provides the in-process implementations.
//
// ============================================================================

pub mod field;
pub mod display;
pub mod memory;
pub mod services;

pub use display::{ComponentOptions, Display, DisplayKind};
pub use field::{ENTITY_REFERENCE, FieldConfig, FieldMapEntry, FieldStorage, HandlerSettings};
pub use memory::{MemoryBundleInfo, MemoryDisplayRepository, MemoryFieldManager};
pub use services::{BundleInfo, DisplayRepository, FieldManager};
