use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which presentation a display config drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayKind {
    /// Edit form
    Form,
    /// Rendered view
    View,
}

impl fmt::Display for DisplayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayKind::Form => write!(f, "form"),
            DisplayKind::View => write!(f, "view"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentOptions {
    pub weight: i32,
}

/// Presentation config of one (entity type, bundle, mode).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Display {
    pub entity_type: String,
    pub bundle: String,
    pub mode: String,
    pub kind: DisplayKind,
    pub status: bool,
    components: BTreeMap<String, ComponentOptions>,
}

impl Display {
    pub fn new(
        entity_type: impl Into<String>,
        bundle: impl Into<String>,
        mode: impl Into<String>,
        kind: DisplayKind,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            bundle: bundle.into(),
            mode: mode.into(),
            kind,
            status: true,
            components: BTreeMap::new(),
        }
    }

    /// `entity_type.bundle.mode`
    pub fn id(&self) -> String {
        format!("{}.{}.{}", self.entity_type, self.bundle, self.mode)
    }

    pub fn enable_field(&mut self, field_name: impl Into<String>, options: ComponentOptions) {
        self.components.insert(field_name.into(), options);
    }

    pub fn component(&self, field_name: &str) -> Option<&ComponentOptions> {
        self.components.get(field_name)
    }

    pub fn is_enabled(&self, field_name: &str) -> bool {
        self.components.contains_key(field_name)
    }
}
