use std::fmt;
use thiserror::Error;

/// Infrastructure faults and configuration rejections.
///
/// Business outcomes of an execution (validation failed, execution declined,
/// already executed) are not errors; see [`crate::engine::ExecutionOutcome`].
#[derive(Error, Debug)]
pub enum TransactorError {
    #[error("Unknown transactor plugin '{0}'")]
    UnknownTransactor(String),

    #[error("Transaction type '{0}' has no transactor bound")]
    MissingTransactor(String),

    #[error("Transaction type '{0}' not found")]
    TransactionTypeNotFound(String),

    #[error("Transaction #{0} not found")]
    TransactionNotFound(u64),

    #[error("Field storage '{entity_type}.{field_name}' already exists")]
    FieldStorageExists {
        entity_type: String,
        field_name: String,
    },

    #[error("Field storage '{entity_type}.{field_name}' does not exist")]
    FieldStorageMissing {
        entity_type: String,
        field_name: String,
    },

    #[error("Field '{field_name}' is already attached to '{entity_type}.{bundle}'")]
    FieldConfigExists {
        entity_type: String,
        bundle: String,
        field_name: String,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Raised by storage backends that can become unavailable
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid configuration: {}", list_errors(.0))]
    InvalidConfiguration(Vec<ConfigurationError>),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TransactorError>;

impl TransactorError {
    /// Configuration problems carried by this error, empty for any other fault.
    pub fn configuration_errors(&self) -> &[ConfigurationError] {
        match self {
            Self::InvalidConfiguration(errors) => errors,
            _ => &[],
        }
    }
}

fn list_errors(errors: &[ConfigurationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A configuration-time problem tied to the element that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationError {
    /// Name of the offending schema element (e.g. `log_message` or
    /// `log_message_field_name` for the machine name of a new field).
    pub element: String,
    pub kind: ConfigurationErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationErrorKind {
    /// A new field was requested under a name already in use.
    FieldNameCollision { field_name: String },
    /// The same concrete field was picked for two bindings of one group.
    DuplicateFieldBinding { field_name: String },
    /// The machine name of a new field is empty, too long or malformed.
    InvalidMachineName { machine_name: String, max_length: usize },
    /// An existing field was picked that has no storage on the entity type.
    UnknownField { field_name: String },
    /// An existing field was picked that is not among the compatible fields.
    IncompatibleField { field_name: String },
    /// A required binding was left empty.
    MissingRequiredBinding,
    /// A new field was requested by an actor not allowed to create fields.
    CreateNotAllowed,
}

impl ConfigurationError {
    pub fn new(element: impl Into<String>, kind: ConfigurationErrorKind) -> Self {
        Self {
            element: element.into(),
            kind,
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ConfigurationErrorKind::FieldNameCollision { field_name } => write!(
                f,
                "{}: the machine-readable name '{}' is already in use. It must be unique.",
                self.element, field_name
            ),
            ConfigurationErrorKind::DuplicateFieldBinding { field_name } => write!(
                f,
                "{}: field '{}' can not be used more than once in the same group.",
                self.element, field_name
            ),
            ConfigurationErrorKind::InvalidMachineName {
                machine_name,
                max_length,
            } => write!(
                f,
                "{}: '{}' must contain only lowercase letters, numbers and underscores, at most {} characters.",
                self.element, machine_name, max_length
            ),
            ConfigurationErrorKind::UnknownField { field_name } => {
                write!(f, "{}: field '{}' does not exist.", self.element, field_name)
            }
            ConfigurationErrorKind::IncompatibleField { field_name } => write!(
                f,
                "{}: field '{}' is not compatible with this binding.",
                self.element, field_name
            ),
            ConfigurationErrorKind::MissingRequiredBinding => {
                write!(f, "{}: a field is required.", self.element)
            }
            ConfigurationErrorKind::CreateNotAllowed => {
                write!(f, "{}: not allowed to create new fields.", self.element)
            }
        }
    }
}
