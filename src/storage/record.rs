use crate::core::{EntityRef, FieldValue, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A stored record of some entity type, the target of transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub entity_type: String,
    pub bundle: String,
    pub id: RecordId,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(
        entity_type: impl Into<String>,
        bundle: impl Into<String>,
        id: RecordId,
        label: impl Into<String>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            bundle: bundle.into(),
            id,
            label: label.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn reference(&self) -> EntityRef {
        EntityRef::new(self.entity_type.clone(), self.id)
    }

    pub fn get(&self, field_name: &str) -> Option<&FieldValue> {
        self.fields.get(field_name)
    }

    pub fn set(&mut self, field_name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field_name.into(), value.into());
    }

    pub fn with_field(
        mut self,
        field_name: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Self {
        self.set(field_name, value);
        self
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }
}
