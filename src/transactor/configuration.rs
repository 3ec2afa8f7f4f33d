// ============================================================================
// Transactor Configuration Schema
// ============================================================================
//
// Declarative description of what an operator configures for a transactor:
// groups of field bindings plus free options. The schema is a plain value;
// whichever presentation layer renders it sends back a submission.
//
// ============================================================================

use crate::core::Text;
use crate::field::{FieldBindingDescriptor, FieldOption};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

lazy_static! {
    static ref MACHINE_NAME_INVALID_CHARS: Regex = Regex::new(r"[^a-z0-9_]+").unwrap();
    static ref MACHINE_NAME: Regex = Regex::new(r"^[a-z0-9_]+$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    /// Fields on the transaction record
    TransactionFields,
    /// Fields on the target record
    TargetFields,
    Options,
}

impl GroupKind {
    pub fn key(&self) -> &'static str {
        match self {
            GroupKind::TransactionFields => "transaction_fields",
            GroupKind::TargetFields => "target_fields",
            GroupKind::Options => "options",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigurationSchema {
    groups: Vec<ConfigurationGroup>,
}

impl ConfigurationSchema {
    pub(crate) fn new(groups: Vec<ConfigurationGroup>) -> Self {
        Self { groups }
    }

    pub fn groups(&self) -> &[ConfigurationGroup] {
        &self.groups
    }

    pub fn group(&self, kind: GroupKind) -> Option<&ConfigurationGroup> {
        self.groups.iter().find(|g| g.kind == kind)
    }

    /// Binding element by name, searched across every group
    pub fn binding(&self, name: &str) -> Option<&FieldBindingElement> {
        self.groups
            .iter()
            .flat_map(|g| g.bindings.iter())
            .find(|b| b.name() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigurationGroup {
    kind: GroupKind,
    title: Text,
    description: Option<Text>,
    weight: i32,
    bindings: Vec<FieldBindingElement>,
    options: Vec<OptionElement>,
}

impl ConfigurationGroup {
    pub(crate) fn fields(kind: GroupKind, bindings: Vec<FieldBindingElement>) -> Self {
        let (title, description, weight) = match kind {
            GroupKind::TransactionFields => (
                "Transaction fields",
                "Fields in the transaction entity used by this type of transaction.",
                10,
            ),
            GroupKind::TargetFields => (
                "Target entity fields",
                "Fields in the target entity used by this type of transaction.",
                20,
            ),
            GroupKind::Options => ("Options", "", 30),
        };
        Self {
            kind,
            title: Text::new(title),
            description: (!description.is_empty()).then(|| Text::new(description)),
            weight,
            bindings,
            options: Vec::new(),
        }
    }

    pub(crate) fn options(options: Vec<OptionElement>) -> Self {
        Self {
            kind: GroupKind::Options,
            title: Text::new("Options"),
            description: None,
            weight: 30,
            bindings: Vec::new(),
            options,
        }
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    pub fn title(&self) -> &Text {
        &self.title
    }

    pub fn description(&self) -> Option<&Text> {
        self.description.as_ref()
    }

    pub fn weight(&self) -> i32 {
        self.weight
    }

    pub fn bindings(&self) -> &[FieldBindingElement] {
        &self.bindings
    }

    pub fn option_elements(&self) -> &[OptionElement] {
        &self.options
    }
}

/// Choice of a concrete field for one descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldBindingElement {
    descriptor: FieldBindingDescriptor,
    default_value: Option<String>,
    options: Vec<FieldOption>,
    empty_option: Text,
    create: Option<NewFieldElement>,
}

impl FieldBindingElement {
    pub(crate) fn new(
        descriptor: FieldBindingDescriptor,
        default_value: Option<String>,
        options: Vec<FieldOption>,
        create: Option<NewFieldElement>,
    ) -> Self {
        Self {
            descriptor,
            default_value,
            options,
            empty_option: Text::new("- None -"),
            create,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &FieldBindingDescriptor {
        &self.descriptor
    }

    /// Field currently bound in the transactor settings
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// Existing compatible fields
    pub fn options(&self) -> &[FieldOption] {
        &self.options
    }

    pub fn empty_option(&self) -> &Text {
        &self.empty_option
    }

    /// Present only when the actor may create fields on the entity type
    pub fn create(&self) -> Option<&NewFieldElement> {
        self.create.as_ref()
    }
}

/// Inputs for creating a new field in place of picking an existing one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewFieldElement {
    pub title: Text,
    pub default_label: String,
    pub default_machine_name: String,
    /// Longest machine name accepted, prefix excluded
    pub max_length: usize,
    pub field_prefix: String,
}

/// A free transactor option.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionElement {
    pub name: String,
    pub title: Text,
    pub description: Option<Text>,
    pub default_value: Value,
}

/// What the operator picked for one binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingChoice {
    /// An existing field by name
    Existing(String),
    /// A new field; the configured prefix goes in front of `machine_name`
    Create { label: String, machine_name: String },
}

/// Operator answers to a configuration schema. Bindings left out are unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationSubmission {
    #[serde(default)]
    bindings: BTreeMap<String, BindingChoice>,
    #[serde(default)]
    options: Map<String, Value>,
}

impl ConfigurationSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_existing(mut self, binding: &str, field_name: &str) -> Self {
        self.bindings.insert(
            binding.to_string(),
            BindingChoice::Existing(field_name.to_string()),
        );
        self
    }

    pub fn create_field(mut self, binding: &str, label: &str, machine_name: &str) -> Self {
        self.bindings.insert(
            binding.to_string(),
            BindingChoice::Create {
                label: label.to_string(),
                machine_name: machine_name.to_string(),
            },
        );
        self
    }

    pub fn option(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.options.insert(name.to_string(), value.into());
        self
    }

    pub fn binding(&self, name: &str) -> Option<&BindingChoice> {
        self.bindings.get(name)
    }

    pub fn option_value(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }
}

/// Machine name suggested for a field titled `title`.
pub fn default_machine_name(title: &str) -> String {
    MACHINE_NAME_INVALID_CHARS
        .replace_all(&title.to_lowercase(), "_")
        .into_owned()
}

pub fn is_valid_machine_name(machine_name: &str, max_length: usize) -> bool {
    machine_name.len() <= max_length && MACHINE_NAME.is_match(machine_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_machine_name() {
        assert_eq!(default_machine_name("Log message"), "log_message");
        assert_eq!(default_machine_name("Last  transaction!"), "last_transaction_");
        assert_eq!(default_machine_name("Qty (units)"), "qty_units_");
    }

    #[test]
    fn test_machine_name_validation() {
        assert!(is_valid_machine_name("last_restock", 26));
        assert!(!is_valid_machine_name("", 26));
        assert!(!is_valid_machine_name("Last", 26));
        assert!(!is_valid_machine_name("a-b", 26));
        assert!(!is_valid_machine_name("abcdef", 5));
    }

    #[test]
    fn test_submission_deserializes() {
        let submission: ConfigurationSubmission = serde_json::from_value(serde_json::json!({
            "bindings": {
                "log_message": {"existing": "field_log"},
                "last_transaction": {"create": {"label": "Last", "machine_name": "last"}},
            }
        }))
        .unwrap();
        assert_eq!(
            submission.binding("log_message"),
            Some(&BindingChoice::Existing("field_log".into()))
        );
        assert!(matches!(
            submission.binding("last_transaction"),
            Some(BindingChoice::Create { .. })
        ));
    }
}
