use super::{BundleRef, FieldBindingDescriptor, FieldDeclaration};
use crate::core::Result;
use crate::schema::{BundleInfo, FieldManager};
use crate::transaction::{TRANSACTION_ENTITY_TYPE, TransactionType};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// An existing field offered for a binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldOption {
    pub field_name: String,
    /// `Label (field_name)`, or the bare name when no label is found
    pub label: String,
}

/// Looks up existing fields compatible with a field binding.
#[derive(Clone)]
pub struct FieldResolver {
    fields: Arc<dyn FieldManager>,
}

impl FieldResolver {
    pub fn new(fields: Arc<dyn FieldManager>) -> Self {
        Self { fields }
    }

    /// Fields of `field_type` on `entity_type` attached to every bundle in
    /// `bundles` whose storage settings match each entry of `settings_match`.
    ///
    /// Results come in discovery order.
    pub async fn find_compatible_fields(
        &self,
        entity_type: &str,
        field_type: &str,
        bundles: &[String],
        settings_match: &Map<String, Value>,
    ) -> Result<Vec<FieldOption>> {
        let mut options = Vec::new();

        for entry in self.fields.field_map(entity_type, field_type).await? {
            let Some(storage) = self
                .fields
                .load_field_storage(entity_type, &entry.field_name)
                .await?
            else {
                continue;
            };

            if !bundles.iter().all(|bundle| entry.in_bundle(bundle)) {
                continue;
            }

            if !storage.matches_settings(settings_match) {
                continue;
            }

            // Label from the most recently attached bundle.
            let label = match entry.bundles.last() {
                Some(bundle) => self
                    .fields
                    .load_field(entity_type, bundle, &entry.field_name)
                    .await?
                    .map(|config| format!("{} ({})", config.label, entry.field_name)),
                None => None,
            };

            options.push(FieldOption {
                label: label.unwrap_or_else(|| entry.field_name.clone()),
                field_name: entry.field_name,
            });
        }

        Ok(options)
    }

    /// Descriptor of a field on the transaction record itself.
    ///
    /// An untargeted reference points at the type's target records,
    /// restricted to its applicable bundles.
    pub async fn transaction_field_descriptor(
        &self,
        declaration: &FieldDeclaration,
        transaction_type: &TransactionType,
        bundle_info: &dyn BundleInfo,
    ) -> Result<FieldBindingDescriptor> {
        let mut descriptor =
            FieldBindingDescriptor::from_declaration(declaration, TRANSACTION_ENTITY_TYPE);

        if descriptor.needs_reference_target() {
            descriptor.settings.insert(
                "target_type".to_string(),
                Value::from(transaction_type.target_entity_type()),
            );
            let bundles = transaction_type.applicable_bundles(bundle_info).await?;
            descriptor.target_bundles = Some(bundles.into_iter().map(BundleRef::Named).collect());
        }

        Ok(descriptor)
    }

    /// Descriptor of a field on the target record.
    ///
    /// An untargeted reference points at transactions of the owning type.
    pub fn target_field_descriptor(
        &self,
        declaration: &FieldDeclaration,
        transaction_type: &TransactionType,
    ) -> FieldBindingDescriptor {
        let mut descriptor = FieldBindingDescriptor::from_declaration(
            declaration,
            transaction_type.target_entity_type(),
        );

        if descriptor.needs_reference_target() {
            descriptor.settings.insert(
                "target_type".to_string(),
                Value::from(TRANSACTION_ENTITY_TYPE),
            );
            descriptor.target_bundles = Some(vec![BundleRef::OwningType]);
        }

        descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        ENTITY_REFERENCE, FieldConfig, FieldStorage, MemoryBundleInfo, MemoryFieldManager,
    };
    use serde_json::json;

    async fn fixture() -> Arc<MemoryFieldManager> {
        let fm = Arc::new(MemoryFieldManager::new());

        fm.create_field_storage(FieldStorage::new("item", "field_note", "string"))
            .await
            .unwrap();
        fm.create_field(FieldConfig::new("item", "basic", "field_note", "Note"))
            .await
            .unwrap();
        fm.create_field(FieldConfig::new("item", "tools", "field_note", "Tool note"))
            .await
            .unwrap();

        fm.create_field_storage(FieldStorage::new("item", "field_basic_only", "string"))
            .await
            .unwrap();
        fm.create_field(FieldConfig::new("item", "basic", "field_basic_only", "Basic only"))
            .await
            .unwrap();

        fm.create_field_storage(
            FieldStorage::new("item", "field_last", ENTITY_REFERENCE)
                .with_setting("target_type", "transaction"),
        )
        .await
        .unwrap();
        fm.create_field(FieldConfig::new("item", "basic", "field_last", "Last"))
            .await
            .unwrap();

        fm.create_field_storage(
            FieldStorage::new("item", "field_owner", ENTITY_REFERENCE)
                .with_setting("target_type", "user"),
        )
        .await
        .unwrap();
        fm.create_field(FieldConfig::new("item", "basic", "field_owner", "Owner"))
            .await
            .unwrap();

        fm
    }

    #[tokio::test]
    async fn test_all_fields_of_type_in_discovery_order() {
        let resolver = FieldResolver::new(fixture().await);
        let options = resolver
            .find_compatible_fields("item", "string", &[], &Map::new())
            .await
            .unwrap();
        assert_eq!(
            options,
            vec![
                FieldOption {
                    field_name: "field_note".into(),
                    label: "Tool note (field_note)".into(),
                },
                FieldOption {
                    field_name: "field_basic_only".into(),
                    label: "Basic only (field_basic_only)".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_field_must_be_in_every_requested_bundle() {
        let resolver = FieldResolver::new(fixture().await);
        let bundles = vec!["basic".to_string(), "tools".to_string()];
        let options = resolver
            .find_compatible_fields("item", "string", &bundles, &Map::new())
            .await
            .unwrap();
        let names: Vec<_> = options.iter().map(|o| o.field_name.as_str()).collect();
        assert_eq!(names, vec!["field_note"]);
    }

    #[tokio::test]
    async fn test_settings_must_match_every_key() {
        let resolver = FieldResolver::new(fixture().await);
        let mut wanted = Map::new();
        wanted.insert("target_type".into(), json!("transaction"));
        let options = resolver
            .find_compatible_fields("item", ENTITY_REFERENCE, &[], &wanted)
            .await
            .unwrap();
        let names: Vec<_> = options.iter().map(|o| o.field_name.as_str()).collect();
        assert_eq!(names, vec!["field_last"]);

        wanted.insert("handler".into(), json!("views"));
        let options = resolver
            .find_compatible_fields("item", ENTITY_REFERENCE, &[], &wanted)
            .await
            .unwrap();
        assert!(options.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_entity_type_yields_nothing() {
        let resolver = FieldResolver::new(fixture().await);
        let options = resolver
            .find_compatible_fields("order", "string", &[], &Map::new())
            .await
            .unwrap();
        assert!(options.is_empty());
    }

    #[tokio::test]
    async fn test_reference_convention() {
        let resolver = FieldResolver::new(Arc::new(MemoryFieldManager::new()));
        let info = MemoryBundleInfo::new();
        info.add_bundle("item", "basic").await;
        info.add_bundle("item", "tools").await;
        let ty = TransactionType::new("restock", "Restock", "item");

        let decl = FieldDeclaration::new("subject", ENTITY_REFERENCE, "Subject");
        let on_transaction = resolver
            .transaction_field_descriptor(&decl, &ty, &info)
            .await
            .unwrap();
        assert_eq!(on_transaction.entity_type, "transaction");
        assert_eq!(on_transaction.target_type(), Some("item"));
        assert_eq!(
            on_transaction.resolve_target_bundles("restock"),
            vec!["basic".to_string(), "tools".to_string()]
        );

        let on_target = resolver.target_field_descriptor(&decl, &ty);
        assert_eq!(on_target.entity_type, "item");
        assert_eq!(on_target.target_type(), Some("transaction"));
        assert_eq!(on_target.resolve_target_bundles("restock"), vec!["restock".to_string()]);

        let explicit = FieldDeclaration::new("owner", ENTITY_REFERENCE, "Owner")
            .setting("target_type", "user");
        let untouched = resolver.target_field_descriptor(&explicit, &ty);
        assert_eq!(untouched.target_type(), Some("user"));
        assert!(untouched.target_bundles.is_none());
    }
}
