use crate::core::Result;
use serde::{Deserialize, Serialize};

/// Engine-wide configuration injected into transactor plugins.
///
/// Mirrors the site-level settings a field UI would expose: the prefix put in
/// front of every field created from a configuration schema and the length
/// limit of field machine names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactorConfig {
    /// Prefix for new field names
    pub field_prefix: String,

    /// Maximum field name length, prefix included
    pub field_name_max_length: usize,

    /// Presentation mode new fields are enabled in
    pub display_mode: String,

    /// Permission needed to offer field creation; `{entity_type}` is replaced
    /// by the entity type the field lives on
    pub create_field_permission: String,
}

impl Default for TransactorConfig {
    fn default() -> Self {
        Self {
            field_prefix: "field_".to_string(),
            field_name_max_length: 32,
            display_mode: "default".to_string(),
            create_field_permission: "administer {entity_type} fields".to_string(),
        }
    }
}

impl TransactorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a JSON document; missing keys keep their defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// # use transactor::TransactorConfig;
    /// let config = TransactorConfig::from_json_str(r#"{"field_prefix": "tx_"}"#).unwrap();
    /// assert_eq!(config.field_prefix, "tx_");
    /// assert_eq!(config.field_name_max_length, 32);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        let prefix = config.field_prefix.clone();
        Ok(config.field_prefix(&prefix))
    }

    /// Set the new field prefix. An empty prefix falls back to `field_`.
    pub fn field_prefix(mut self, prefix: &str) -> Self {
        self.field_prefix = if prefix.is_empty() {
            "field_".to_string()
        } else {
            prefix.to_string()
        };
        self
    }

    pub fn field_name_max_length(mut self, max: usize) -> Self {
        self.field_name_max_length = max;
        self
    }

    pub fn display_mode(mut self, mode: &str) -> Self {
        self.display_mode = mode.to_string();
        self
    }

    pub fn create_field_permission(mut self, template: &str) -> Self {
        self.create_field_permission = template.to_string();
        self
    }

    /// Longest machine name an operator may type for a new field.
    pub fn machine_name_max_length(&self) -> usize {
        self.field_name_max_length
            .saturating_sub(self.field_prefix.len())
    }

    /// Permission required to create fields on `entity_type`.
    pub fn create_field_permission_for(&self, entity_type: &str) -> String {
        self.create_field_permission
            .replace("{entity_type}", entity_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransactorConfig::default();
        assert_eq!(config.field_prefix, "field_");
        assert_eq!(config.machine_name_max_length(), 26);
        assert_eq!(
            config.create_field_permission_for("node"),
            "administer node fields"
        );
    }

    #[test]
    fn test_empty_prefix_falls_back() {
        let config = TransactorConfig::new().field_prefix("");
        assert_eq!(config.field_prefix, "field_");
    }

    #[test]
    fn test_from_json_keeps_defaults() {
        let config =
            TransactorConfig::from_json_str(r#"{"field_name_max_length": 40}"#).unwrap();
        assert_eq!(config.field_prefix, "field_");
        assert_eq!(config.machine_name_max_length(), 34);
    }

    #[test]
    fn test_from_json_empty_prefix_falls_back() {
        let config = TransactorConfig::from_json_str(r#"{"field_prefix": ""}"#).unwrap();
        assert_eq!(config.field_prefix, "field_");
        assert_eq!(config.machine_name_max_length(), 26);
    }
}
