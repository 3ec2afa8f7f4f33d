use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field type of references to other records.
pub const ENTITY_REFERENCE: &str = "entity_reference";

/// Storage definition of a field, shared by every bundle it is attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldStorage {
    pub entity_type: String,
    pub field_name: String,
    pub field_type: String,
    #[serde(default)]
    pub settings: Map<String, Value>,
}

impl FieldStorage {
    pub fn new(
        entity_type: impl Into<String>,
        field_name: impl Into<String>,
        field_type: impl Into<String>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            field_name: field_name.into(),
            field_type: field_type.into(),
            settings: Map::new(),
        }
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    /// True if every key/value in `settings_match` equals the stored setting.
    pub fn matches_settings(&self, settings_match: &Map<String, Value>) -> bool {
        settings_match
            .iter()
            .all(|(key, value)| self.settings.get(key) == Some(value))
    }

    /// `entity_type.field_name`
    pub fn id(&self) -> String {
        format!("{}.{}", self.entity_type, self.field_name)
    }
}

/// Selection handler settings of a reference field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerSettings {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_bundles: Vec<String>,
}

/// Attachment of a field storage to one bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub entity_type: String,
    pub bundle: String,
    pub field_name: String,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_handler")]
    pub handler: String,
    #[serde(default)]
    pub handler_settings: HandlerSettings,
}

fn default_handler() -> String {
    "default".to_string()
}

impl FieldConfig {
    pub fn new(
        entity_type: impl Into<String>,
        bundle: impl Into<String>,
        field_name: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            bundle: bundle.into(),
            field_name: field_name.into(),
            label: label.into(),
            required: false,
            handler: default_handler(),
            handler_settings: HandlerSettings::default(),
        }
    }
}

/// One field of a given type on an entity type and the bundles carrying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapEntry {
    pub field_name: String,
    /// Bundles in attachment order
    pub bundles: Vec<String>,
}

impl FieldMapEntry {
    pub fn in_bundle(&self, bundle: &str) -> bool {
        self.bundles.iter().any(|b| b == bundle)
    }
}
