use super::FieldBindingDescriptor;
use crate::core::{Result, TransactorError};
use crate::schema::{
    ComponentOptions, DisplayKind, DisplayRepository, FieldConfig, FieldManager, FieldStorage,
    HandlerSettings,
};
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

/// What to provision for one binding.
#[derive(Debug, Clone, Copy)]
pub struct ProvisionRequest<'a> {
    pub descriptor: &'a FieldBindingDescriptor,
    /// Final field name, prefix included
    pub field_name: &'a str,
    /// Label of the per-bundle attachments
    pub label: &'a str,
    /// Id of the transaction type owning the binding, substituted for
    /// `BundleRef::OwningType`
    pub owning_type_id: &'a str,
}

/// Creates field storages and bundle attachments for bindings that have no
/// suitable field yet.
#[derive(Clone)]
pub struct FieldProvisioner {
    fields: Arc<dyn FieldManager>,
    displays: Arc<dyn DisplayRepository>,
    display_mode: String,
}

impl FieldProvisioner {
    pub fn new(
        fields: Arc<dyn FieldManager>,
        displays: Arc<dyn DisplayRepository>,
        display_mode: impl Into<String>,
    ) -> Self {
        Self {
            fields,
            displays,
            display_mode: display_mode.into(),
        }
    }

    /// Create the storage if missing, then attach the field to every bundle
    /// not carrying it yet. Safe to repeat.
    pub async fn provision_field(
        &self,
        request: &ProvisionRequest<'_>,
        bundles: &[String],
    ) -> Result<String> {
        let span = info_span!(
            "field.provision",
            entity_type = %request.descriptor.entity_type,
            field_name = %request.field_name
        );

        async {
            self.ensure_storage(request.descriptor, request.field_name)
                .await?;
            self.attach_to_bundles(request, bundles).await?;
            Ok(request.field_name.to_string())
        }
        .instrument(span)
        .await
    }

    /// Returns true if the storage was created by this call.
    pub async fn ensure_storage(
        &self,
        descriptor: &FieldBindingDescriptor,
        field_name: &str,
    ) -> Result<bool> {
        if self
            .fields
            .field_exists(&descriptor.entity_type, field_name)
            .await?
        {
            return Ok(false);
        }

        let storage = FieldStorage {
            entity_type: descriptor.entity_type.clone(),
            field_name: field_name.to_string(),
            field_type: descriptor.field_type.clone(),
            settings: descriptor.settings.clone(),
        };

        match self.fields.create_field_storage(storage).await {
            Ok(()) => {
                event!(
                    Level::INFO,
                    entity_type = %descriptor.entity_type,
                    field_name = %field_name,
                    field_type = %descriptor.field_type,
                    "field storage created"
                );
                Ok(true)
            }
            // Lost a creation race; the storage is there either way.
            Err(TransactorError::FieldStorageExists { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Attach the field to each bundle lacking it and enable it in the
    /// default edit and view displays. Returns the bundles attached now.
    pub async fn attach_to_bundles(
        &self,
        request: &ProvisionRequest<'_>,
        bundles: &[String],
    ) -> Result<Vec<String>> {
        let descriptor = request.descriptor;
        let mut attached = Vec::new();

        for bundle in bundles {
            if self
                .fields
                .load_field(&descriptor.entity_type, bundle, request.field_name)
                .await?
                .is_some()
            {
                event!(Level::DEBUG, bundle = %bundle, "field already attached");
                continue;
            }

            let field = FieldConfig {
                entity_type: descriptor.entity_type.clone(),
                bundle: bundle.clone(),
                field_name: request.field_name.to_string(),
                label: request.label.to_string(),
                required: descriptor.required,
                handler: "default".to_string(),
                handler_settings: HandlerSettings {
                    target_bundles: descriptor.resolve_target_bundles(request.owning_type_id),
                },
            };

            match self.fields.create_field(field).await {
                Ok(()) => {}
                Err(TransactorError::FieldConfigExists { .. }) => continue,
                Err(err) => return Err(err),
            }

            for kind in [DisplayKind::Form, DisplayKind::View] {
                self.enable_in_display(&descriptor.entity_type, bundle, request.field_name, kind)
                    .await?;
            }

            event!(Level::INFO, bundle = %bundle, "field attached to bundle");
            attached.push(bundle.clone());
        }

        Ok(attached)
    }

    async fn enable_in_display(
        &self,
        entity_type: &str,
        bundle: &str,
        field_name: &str,
        kind: DisplayKind,
    ) -> Result<()> {
        let mut display = self
            .displays
            .load_or_create(entity_type, bundle, &self.display_mode, kind)
            .await?;
        display.enable_field(field_name, ComponentOptions { weight: 0 });
        self.displays.save(display).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{BundleRef, FieldDeclaration};
    use crate::schema::{ENTITY_REFERENCE, MemoryDisplayRepository, MemoryFieldManager};

    fn descriptor() -> FieldBindingDescriptor {
        let mut descriptor = FieldBindingDescriptor::from_declaration(
            &FieldDeclaration::new("last_transaction", ENTITY_REFERENCE, "Last transaction")
                .setting("target_type", "transaction"),
            "item",
        );
        descriptor.target_bundles = Some(vec![BundleRef::OwningType]);
        descriptor
    }

    #[tokio::test]
    async fn test_provision_is_idempotent() {
        let fm = Arc::new(MemoryFieldManager::new());
        let displays = Arc::new(MemoryDisplayRepository::new());
        let provisioner = FieldProvisioner::new(fm.clone(), displays.clone(), "default");
        let descriptor = descriptor();
        let request = ProvisionRequest {
            descriptor: &descriptor,
            field_name: "field_last_restock",
            label: "Last restock",
            owning_type_id: "restock",
        };
        let bundles = vec!["basic".to_string(), "tools".to_string()];

        let name = provisioner.provision_field(&request, &bundles).await.unwrap();
        assert_eq!(name, "field_last_restock");
        provisioner.provision_field(&request, &bundles).await.unwrap();

        assert_eq!(fm.storage_count("item", "field_last_restock").await, 1);
        for bundle in &bundles {
            assert_eq!(fm.attachment_count("item", bundle, "field_last_restock").await, 1);
        }

        let config = fm
            .load_field("item", "basic", "field_last_restock")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(config.label, "Last restock");
        assert_eq!(config.handler_settings.target_bundles, vec!["restock".to_string()]);

        for kind in [DisplayKind::Form, DisplayKind::View] {
            let display = displays.get("item", "tools", "default", kind).await.unwrap();
            assert!(display.is_enabled("field_last_restock"));
        }
    }

    #[tokio::test]
    async fn test_attach_skips_bundles_already_carrying_field() {
        let fm = Arc::new(MemoryFieldManager::new());
        let displays = Arc::new(MemoryDisplayRepository::new());
        let provisioner = FieldProvisioner::new(fm.clone(), displays, "default");
        let descriptor = descriptor();
        let request = ProvisionRequest {
            descriptor: &descriptor,
            field_name: "field_last",
            label: "Last",
            owning_type_id: "restock",
        };

        provisioner
            .provision_field(&request, &["basic".to_string()])
            .await
            .unwrap();
        let attached = provisioner
            .attach_to_bundles(&request, &["basic".to_string(), "tools".to_string()])
            .await
            .unwrap();
        assert_eq!(attached, vec!["tools".to_string()]);
    }
}
