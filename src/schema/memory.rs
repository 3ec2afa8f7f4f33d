use super::{
    BundleInfo, Display, DisplayKind, DisplayRepository, FieldConfig, FieldManager,
    FieldMapEntry, FieldStorage,
};
use crate::core::{Result, TransactorError};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

/// Bundle registry keyed by entity type.
#[derive(Default)]
pub struct MemoryBundleInfo {
    bundles: RwLock<HashMap<String, BTreeSet<String>>>,
}

impl MemoryBundleInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_bundle(&self, entity_type: &str, bundle: &str) {
        let mut bundles = self.bundles.write().await;
        bundles
            .entry(entity_type.to_string())
            .or_default()
            .insert(bundle.to_string());
    }
}

#[async_trait]
impl BundleInfo for MemoryBundleInfo {
    async fn list_bundles(&self, entity_type: &str) -> Result<Vec<String>> {
        let bundles = self.bundles.read().await;
        Ok(bundles
            .get(entity_type)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[derive(Default)]
struct FieldTables {
    /// Creation order is discovery order
    storages: Vec<FieldStorage>,
    fields: Vec<FieldConfig>,
}

/// Field storages and bundle attachments held in memory.
///
/// Creation is serialized by the write lock, so two concurrent attempts to
/// create the same storage end with exactly one winner.
#[derive(Default)]
pub struct MemoryFieldManager {
    tables: RwLock<FieldTables>,
}

impl MemoryFieldManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn storage_count(&self, entity_type: &str, field_name: &str) -> usize {
        let tables = self.tables.read().await;
        tables
            .storages
            .iter()
            .filter(|s| s.entity_type == entity_type && s.field_name == field_name)
            .count()
    }

    pub async fn attachment_count(
        &self,
        entity_type: &str,
        bundle: &str,
        field_name: &str,
    ) -> usize {
        let tables = self.tables.read().await;
        tables
            .fields
            .iter()
            .filter(|f| {
                f.entity_type == entity_type && f.bundle == bundle && f.field_name == field_name
            })
            .count()
    }
}

#[async_trait]
impl FieldManager for MemoryFieldManager {
    async fn field_map(&self, entity_type: &str, field_type: &str) -> Result<Vec<FieldMapEntry>> {
        let tables = self.tables.read().await;
        let entries = tables
            .storages
            .iter()
            .filter(|s| s.entity_type == entity_type && s.field_type == field_type)
            .filter_map(|s| {
                let bundles: Vec<String> = tables
                    .fields
                    .iter()
                    .filter(|f| f.entity_type == entity_type && f.field_name == s.field_name)
                    .map(|f| f.bundle.clone())
                    .collect();
                if bundles.is_empty() {
                    None
                } else {
                    Some(FieldMapEntry {
                        field_name: s.field_name.clone(),
                        bundles,
                    })
                }
            })
            .collect();
        Ok(entries)
    }

    async fn load_field_storage(
        &self,
        entity_type: &str,
        field_name: &str,
    ) -> Result<Option<FieldStorage>> {
        let tables = self.tables.read().await;
        Ok(tables
            .storages
            .iter()
            .find(|s| s.entity_type == entity_type && s.field_name == field_name)
            .cloned())
    }

    async fn load_field(
        &self,
        entity_type: &str,
        bundle: &str,
        field_name: &str,
    ) -> Result<Option<FieldConfig>> {
        let tables = self.tables.read().await;
        Ok(tables
            .fields
            .iter()
            .find(|f| {
                f.entity_type == entity_type && f.bundle == bundle && f.field_name == field_name
            })
            .cloned())
    }

    async fn create_field_storage(&self, storage: FieldStorage) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables
            .storages
            .iter()
            .any(|s| s.entity_type == storage.entity_type && s.field_name == storage.field_name)
        {
            return Err(TransactorError::FieldStorageExists {
                entity_type: storage.entity_type,
                field_name: storage.field_name,
            });
        }
        tables.storages.push(storage);
        Ok(())
    }

    async fn create_field(&self, field: FieldConfig) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables
            .storages
            .iter()
            .any(|s| s.entity_type == field.entity_type && s.field_name == field.field_name)
        {
            return Err(TransactorError::FieldStorageMissing {
                entity_type: field.entity_type,
                field_name: field.field_name,
            });
        }
        if tables.fields.iter().any(|f| {
            f.entity_type == field.entity_type
                && f.bundle == field.bundle
                && f.field_name == field.field_name
        }) {
            return Err(TransactorError::FieldConfigExists {
                entity_type: field.entity_type,
                bundle: field.bundle,
                field_name: field.field_name,
            });
        }
        tables.fields.push(field);
        Ok(())
    }
}

type DisplayKey = (String, String, String, DisplayKind);

/// Display configs held in memory.
#[derive(Default)]
pub struct MemoryDisplayRepository {
    displays: RwLock<HashMap<DisplayKey, Display>>,
}

impl MemoryDisplayRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored display, without creating one.
    pub async fn get(
        &self,
        entity_type: &str,
        bundle: &str,
        mode: &str,
        kind: DisplayKind,
    ) -> Option<Display> {
        let displays = self.displays.read().await;
        displays
            .get(&(entity_type.to_string(), bundle.to_string(), mode.to_string(), kind))
            .cloned()
    }
}

#[async_trait]
impl DisplayRepository for MemoryDisplayRepository {
    async fn load_or_create(
        &self,
        entity_type: &str,
        bundle: &str,
        mode: &str,
        kind: DisplayKind,
    ) -> Result<Display> {
        if let Some(display) = self.get(entity_type, bundle, mode, kind).await {
            return Ok(display);
        }
        Ok(Display::new(entity_type, bundle, mode, kind))
    }

    async fn save(&self, display: Display) -> Result<()> {
        let mut displays = self.displays.write().await;
        let key = (
            display.entity_type.clone(),
            display.bundle.clone(),
            display.mode.clone(),
            display.kind,
        );
        displays.insert(key, display);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ENTITY_REFERENCE;

    #[tokio::test]
    async fn test_field_map_lists_attached_fields_in_creation_order() {
        let fm = MemoryFieldManager::new();
        fm.create_field_storage(FieldStorage::new("node", "field_b", "string"))
            .await
            .unwrap();
        fm.create_field_storage(FieldStorage::new("node", "field_a", "string"))
            .await
            .unwrap();
        fm.create_field_storage(FieldStorage::new("node", "field_ref", ENTITY_REFERENCE))
            .await
            .unwrap();
        fm.create_field(FieldConfig::new("node", "page", "field_b", "B"))
            .await
            .unwrap();
        fm.create_field(FieldConfig::new("node", "page", "field_a", "A"))
            .await
            .unwrap();

        let map = fm.field_map("node", "string").await.unwrap();
        let names: Vec<&str> = map.iter().map(|e| e.field_name.as_str()).collect();
        assert_eq!(names, vec!["field_b", "field_a"]);
    }

    #[tokio::test]
    async fn test_duplicate_storage_rejected() {
        let fm = MemoryFieldManager::new();
        fm.create_field_storage(FieldStorage::new("node", "field_a", "string"))
            .await
            .unwrap();
        let err = fm
            .create_field_storage(FieldStorage::new("node", "field_a", "string"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransactorError::FieldStorageExists { .. }));
        assert_eq!(fm.storage_count("node", "field_a").await, 1);
    }

    #[tokio::test]
    async fn test_attach_requires_storage() {
        let fm = MemoryFieldManager::new();
        let err = fm
            .create_field(FieldConfig::new("node", "page", "field_a", "A"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransactorError::FieldStorageMissing { .. }));
    }

    #[tokio::test]
    async fn test_display_load_or_create_is_not_persisted_until_saved() {
        let repo = MemoryDisplayRepository::new();
        let mut display = repo
            .load_or_create("node", "page", "default", DisplayKind::View)
            .await
            .unwrap();
        assert!(repo.get("node", "page", "default", DisplayKind::View).await.is_none());

        display.enable_field("field_a", Default::default());
        repo.save(display).await.unwrap();

        let stored = repo
            .load_or_create("node", "page", "default", DisplayKind::View)
            .await
            .unwrap();
        assert!(stored.is_enabled("field_a"));
    }
}
