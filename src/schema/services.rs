use super::{Display, DisplayKind, FieldConfig, FieldMapEntry, FieldStorage};
use crate::core::Result;
use async_trait::async_trait;

/// Bundle information of record types.
#[async_trait]
pub trait BundleInfo: Send + Sync {
    /// All bundle names of `entity_type`, sorted.
    async fn list_bundles(&self, entity_type: &str) -> Result<Vec<String>>;
}

/// Field definitions of record types.
#[async_trait]
pub trait FieldManager: Send + Sync {
    /// Fields of `field_type` on `entity_type` that are attached to at least
    /// one bundle, in creation order.
    async fn field_map(&self, entity_type: &str, field_type: &str) -> Result<Vec<FieldMapEntry>>;

    async fn load_field_storage(
        &self,
        entity_type: &str,
        field_name: &str,
    ) -> Result<Option<FieldStorage>>;

    async fn load_field(
        &self,
        entity_type: &str,
        bundle: &str,
        field_name: &str,
    ) -> Result<Option<FieldConfig>>;

    async fn field_exists(&self, entity_type: &str, field_name: &str) -> Result<bool> {
        Ok(self
            .load_field_storage(entity_type, field_name)
            .await?
            .is_some())
    }

    /// Fails with `FieldStorageExists` if the storage is already there.
    async fn create_field_storage(&self, storage: FieldStorage) -> Result<()>;

    /// Fails with `FieldConfigExists` if the bundle already carries the field
    /// and with `FieldStorageMissing` if there is no storage for it.
    async fn create_field(&self, field: FieldConfig) -> Result<()>;
}

/// Edit and view presentation configs.
#[async_trait]
pub trait DisplayRepository: Send + Sync {
    /// The stored display, or a fresh enabled one if none exists yet.
    async fn load_or_create(
        &self,
        entity_type: &str,
        bundle: &str,
        mode: &str,
        kind: DisplayKind,
    ) -> Result<Display>;

    async fn save(&self, display: Display) -> Result<()>;
}
