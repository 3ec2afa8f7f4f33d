pub mod error;
pub mod text;
pub mod types;

pub use error::{ConfigurationError, ConfigurationErrorKind, Result, TransactorError};
pub use text::Text;
pub use types::{EntityRef, FieldValue, RecordId};
