use crate::schema::ENTITY_REFERENCE;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A field a transactor needs, as declared statically by the plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDeclaration {
    /// Settings key the chosen field name is stored under
    pub name: String,
    pub field_type: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub settings: Map<String, Value>,
}

impl FieldDeclaration {
    pub fn new(name: &str, field_type: &str, title: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: field_type.to_string(),
            title: title.to_string(),
            description: String::new(),
            required: false,
            settings: Map::new(),
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn setting(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.settings.insert(key.to_string(), value.into());
        self
    }
}

/// A bundle restriction of a reference field.
///
/// `OwningType` stands for the id of the transaction type being configured,
/// which may not be known while the schema is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BundleRef {
    Named(String),
    OwningType,
}

/// A declaration placed on a concrete entity type, used to search for or
/// create a field. Never persisted; only the chosen field name is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldBindingDescriptor {
    pub name: String,
    pub title: String,
    pub description: String,
    pub required: bool,
    pub entity_type: String,
    pub field_type: String,
    pub settings: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_bundles: Option<Vec<BundleRef>>,
}

impl FieldBindingDescriptor {
    pub fn from_declaration(declaration: &FieldDeclaration, entity_type: &str) -> Self {
        Self {
            name: declaration.name.clone(),
            title: declaration.title.clone(),
            description: declaration.description.clone(),
            required: declaration.required,
            entity_type: entity_type.to_string(),
            field_type: declaration.field_type.clone(),
            settings: declaration.settings.clone(),
            target_bundles: None,
        }
    }

    pub fn is_reference(&self) -> bool {
        self.field_type == ENTITY_REFERENCE
    }

    /// A reference field that does not name what it points to yet.
    pub fn needs_reference_target(&self) -> bool {
        self.is_reference() && !self.settings.contains_key("target_type")
    }

    pub fn target_type(&self) -> Option<&str> {
        self.settings.get("target_type").and_then(Value::as_str)
    }

    /// Target bundles with `OwningType` replaced by `owning_type_id`.
    pub fn resolve_target_bundles(&self, owning_type_id: &str) -> Vec<String> {
        self.target_bundles
            .iter()
            .flatten()
            .map(|bundle| match bundle {
                BundleRef::Named(name) => name.clone(),
                BundleRef::OwningType => owning_type_id.to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_owning_type_placeholder_resolution() {
        let mut descriptor = FieldBindingDescriptor::from_declaration(
            &FieldDeclaration::new("last_transaction", ENTITY_REFERENCE, "Last transaction"),
            "inventory_item",
        );
        assert!(descriptor.needs_reference_target());
        assert!(descriptor.resolve_target_bundles("restock").is_empty());

        descriptor.target_bundles = Some(vec![
            BundleRef::OwningType,
            BundleRef::Named("sale".into()),
        ]);
        assert_eq!(
            descriptor.resolve_target_bundles("restock"),
            vec!["restock".to_string(), "sale".to_string()]
        );
    }

    #[test]
    fn test_placeholder_serializes_as_null() {
        let refs = vec![BundleRef::Named("a".into()), BundleRef::OwningType];
        assert_eq!(serde_json::to_value(&refs).unwrap(), json!(["a", null]));
    }
}
