use crate::core::Result;
use crate::schema::BundleInfo;
use lazy_static::lazy_static;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

lazy_static! {
    static ref EMPTY_SETTINGS: Map<String, Value> = Map::new();
}

/// The transactor plugin bound to a transaction type and its settings.
///
/// Settings always travel together with the plugin id: binding a new plugin
/// starts from empty settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactorBinding {
    pub id: String,
    #[serde(default)]
    pub settings: Map<String, Value>,
}

/// Configuration entity binding a target record type, a transactor and its
/// settings. Its id is the bundle name of the transactions it types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionType {
    id: String,

    #[serde(default)]
    label: String,

    target_entity_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    transactor: Option<TransactorBinding>,

    /// Sorted, deduplicated, no blanks; empty means every bundle
    #[serde(default, deserialize_with = "deserialize_bundles")]
    bundles: Vec<String>,

    #[serde(default)]
    options: Map<String, Value>,
}

impl TransactionType {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        target_entity_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            target_entity_type: target_entity_type.into(),
            transactor: None,
            bundles: Vec::new(),
            options: Map::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) -> &mut Self {
        self.label = label.into();
        self
    }

    pub fn target_entity_type(&self) -> &str {
        &self.target_entity_type
    }

    pub fn set_target_entity_type(&mut self, entity_type: impl Into<String>) -> &mut Self {
        self.target_entity_type = entity_type.into();
        self
    }

    /// Stored applicable bundles; empty means all bundles
    pub fn bundles(&self) -> &[String] {
        &self.bundles
    }

    /// Replace the applicable bundles, dropping blanks and duplicates.
    pub fn set_bundles<I, S>(&mut self, bundles: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.bundles = sanitize_bundles(bundles);
        self
    }

    /// Stored bundles, or every bundle of the target type when none are set.
    pub async fn applicable_bundles(&self, bundle_info: &dyn BundleInfo) -> Result<Vec<String>> {
        if !self.bundles.is_empty() {
            return Ok(self.bundles.clone());
        }
        bundle_info.list_bundles(&self.target_entity_type).await
    }

    pub fn plugin_id(&self) -> Option<&str> {
        self.transactor.as_ref().map(|t| t.id.as_str())
    }

    /// Bind a transactor plugin. Always resets its settings.
    pub fn set_plugin_id(&mut self, plugin_id: impl Into<String>) -> &mut Self {
        self.transactor = Some(TransactorBinding {
            id: plugin_id.into(),
            settings: Map::new(),
        });
        self
    }

    pub fn plugin_settings(&self) -> &Map<String, Value> {
        match &self.transactor {
            Some(binding) => &binding.settings,
            None => &EMPTY_SETTINGS,
        }
    }

    /// A settings value read as a string, e.g. a bound field name.
    pub fn plugin_setting_str(&self, key: &str) -> Option<&str> {
        self.plugin_settings().get(key).and_then(Value::as_str)
    }

    /// Replace the plugin settings. Ignored while no plugin is bound.
    pub fn set_plugin_settings(&mut self, settings: Map<String, Value>) -> &mut Self {
        if let Some(binding) = self.transactor.as_mut() {
            binding.settings = settings;
        }
        self
    }

    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    /// Option value, or `default_value` if unset
    pub fn option_or(&self, name: &str, default_value: Value) -> Value {
        self.options.get(name).cloned().unwrap_or(default_value)
    }

    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    pub fn set_option(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.options.insert(name.into(), value.into());
        self
    }

    pub fn set_options(&mut self, options: Map<String, Value>) -> &mut Self {
        self.options = options;
        self
    }

    /// Re-apply the stored-value invariants. Run before every save.
    pub fn pre_save(&mut self) {
        self.bundles = sanitize_bundles(&self.bundles);
    }
}

/// Sort, deduplicate and drop blank bundle names.
pub fn sanitize_bundles<I, S>(bundles: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut clean: Vec<String> = bundles
        .into_iter()
        .filter(|b| !b.as_ref().trim().is_empty())
        .map(|b| b.as_ref().to_string())
        .collect();
    clean.sort();
    clean.dedup();
    clean
}

fn deserialize_bundles<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Option<String>>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(sanitize_bundles(raw.into_iter().flatten()))
}
