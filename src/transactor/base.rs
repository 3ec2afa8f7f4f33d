use super::configuration::{
    BindingChoice, ConfigurationGroup, ConfigurationSchema, ConfigurationSubmission,
    FieldBindingElement, GroupKind, NewFieldElement, OptionElement, default_machine_name,
    is_valid_machine_name,
};
use super::{TransactorDefinition, TransactorServices};
use crate::core::{ConfigurationError, ConfigurationErrorKind, Result, Text, TransactorError};
use crate::field::{
    FieldBindingDescriptor, FieldOption, FieldProvisioner, FieldResolver, ProvisionRequest,
};
use crate::transaction::{TRANSACTION_ENTITY_TYPE, Transaction, TransactionType};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::{Instrument, Level, event, info_span};

/// State and default behaviours shared by every transactor.
///
/// A plugin instance is bound to one transaction type; its settings are the
/// transactor settings of that type.
pub struct TransactorBase {
    definition: TransactorDefinition,
    transaction_type: TransactionType,
    services: TransactorServices,
    resolver: FieldResolver,
    provisioner: FieldProvisioner,
}

impl TransactorBase {
    pub fn new(
        definition: TransactorDefinition,
        transaction_type: TransactionType,
        services: TransactorServices,
    ) -> Self {
        Self {
            resolver: services.resolver(),
            provisioner: services.provisioner(),
            definition,
            transaction_type,
            services,
        }
    }

    pub fn definition(&self) -> &TransactorDefinition {
        &self.definition
    }

    pub fn transaction_type(&self) -> &TransactionType {
        &self.transaction_type
    }

    pub fn services(&self) -> &TransactorServices {
        &self.services
    }

    pub fn settings(&self) -> &Map<String, Value> {
        self.transaction_type.plugin_settings()
    }

    /// Field name bound under `key`, if any
    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.transaction_type.plugin_setting_str(key)
    }

    /// Pending, with a target of the type's record type that still exists.
    pub async fn validate_transaction(&self, transaction: &Transaction) -> Result<bool> {
        if !transaction.is_pending() {
            return Ok(false);
        }

        let Some(target) = transaction.target() else {
            event!(Level::DEBUG, "transaction has no target");
            return Ok(false);
        };

        if target.entity_type != self.transaction_type.target_entity_type() {
            event!(
                Level::DEBUG,
                target = %target,
                expected = %self.transaction_type.target_entity_type(),
                "target record of the wrong type"
            );
            return Ok(false);
        }

        let exists = self
            .services
            .records
            .load(&target.entity_type, target.id)
            .await?
            .is_some();
        if !exists {
            event!(Level::DEBUG, target = %target, "target record missing");
        }
        Ok(exists)
    }

    /// No side effects of its own.
    pub async fn execute_transaction(
        &self,
        _transaction: &mut Transaction,
        _last_executed: Option<&Transaction>,
    ) -> Result<bool> {
        Ok(true)
    }

    pub fn transaction_description(
        &self,
        transaction: &Transaction,
        langcode: Option<&str>,
    ) -> Text {
        let text = match (transaction.id(), transaction.is_pending()) {
            (None, true) => Text::new("Unsaved transaction (pending)"),
            (None, false) => Text::new("Unsaved transaction"),
            (Some(id), true) => Text::new("Transaction @number (pending)").arg("@number", id),
            (Some(id), false) => Text::new("Transaction @number").arg("@number", id),
        };
        text.langcode(langcode)
    }

    pub async fn execution_indications(
        &self,
        transaction: &Transaction,
        langcode: Option<&str>,
    ) -> Result<Text> {
        let label = match transaction.target() {
            Some(target) => match self
                .services
                .records
                .load(&target.entity_type, target.id)
                .await?
            {
                Some(record) if !record.label.is_empty() => record.label,
                _ => target.to_string(),
            },
            None => String::new(),
        };

        Ok(
            Text::new("The target entity %label may be altered by the transaction.")
                .arg("%label", label)
                .langcode(langcode),
        )
    }

    /// Field binding groups from the static declarations, plus `options`.
    pub async fn build_configuration_schema(
        &self,
        options: Vec<OptionElement>,
    ) -> Result<ConfigurationSchema> {
        let transaction_type = &self.transaction_type;
        let mut groups = Vec::new();

        if !self.definition.transaction_fields.is_empty() {
            let mut bindings = Vec::new();
            for declaration in &self.definition.transaction_fields {
                let descriptor = self
                    .resolver
                    .transaction_field_descriptor(
                        declaration,
                        transaction_type,
                        self.services.bundles.as_ref(),
                    )
                    .await?;
                let existing = self.compatible_fields(&descriptor).await?;
                bindings.push(self.binding_element(descriptor, existing));
            }
            groups.push(ConfigurationGroup::fields(GroupKind::TransactionFields, bindings));
        }

        if !self.definition.target_entity_fields.is_empty() {
            let mut bindings = Vec::new();
            for declaration in &self.definition.target_entity_fields {
                let descriptor = self
                    .resolver
                    .target_field_descriptor(declaration, transaction_type);
                let existing = self.compatible_fields(&descriptor).await?;
                bindings.push(self.binding_element(descriptor, existing));
            }
            groups.push(ConfigurationGroup::fields(GroupKind::TargetFields, bindings));
        }

        if !options.is_empty() {
            groups.push(ConfigurationGroup::options(options));
        }

        Ok(ConfigurationSchema::new(groups))
    }

    async fn compatible_fields(
        &self,
        descriptor: &FieldBindingDescriptor,
    ) -> Result<Vec<FieldOption>> {
        self.resolver
            .find_compatible_fields(
                &descriptor.entity_type,
                &descriptor.field_type,
                &[],
                &descriptor.settings,
            )
            .await
    }

    fn binding_element(
        &self,
        descriptor: FieldBindingDescriptor,
        existing: Vec<FieldOption>,
    ) -> FieldBindingElement {
        let config = &self.services.config;
        let default_value = self.setting_str(&descriptor.name).map(str::to_string);

        let permission = config.create_field_permission_for(&descriptor.entity_type);
        let create = self
            .services
            .actor
            .has_permission(&permission)
            .then(|| NewFieldElement {
                title: Text::new("Create a new field for @name").arg("@name", &descriptor.title),
                default_label: descriptor.title.clone(),
                default_machine_name: default_machine_name(&descriptor.title),
                max_length: config.machine_name_max_length(),
                field_prefix: config.field_prefix.clone(),
            });

        FieldBindingElement::new(descriptor, default_value, existing, create)
    }

    /// Every problem of the submission, grouped per offending element.
    pub async fn validate_configuration(
        &self,
        schema: &ConfigurationSchema,
        submission: &ConfigurationSubmission,
    ) -> Result<Vec<ConfigurationError>> {
        let prefix = &self.services.config.field_prefix;
        let mut errors = Vec::new();

        for group in schema.groups() {
            // field id -> first element using it
            let mut used: HashMap<String, String> = HashMap::new();
            let mut reported: HashSet<String> = HashSet::new();

            for element in group.bindings() {
                let name = element.name();
                let descriptor = element.descriptor();

                let (element_name, field_name) = match submission.binding(name) {
                    None => {
                        if descriptor.required {
                            errors.push(ConfigurationError::new(
                                name,
                                ConfigurationErrorKind::MissingRequiredBinding,
                            ));
                        }
                        continue;
                    }
                    Some(BindingChoice::Existing(field_name)) => {
                        if !self
                            .services
                            .fields
                            .field_exists(&descriptor.entity_type, field_name)
                            .await?
                        {
                            errors.push(ConfigurationError::new(
                                name,
                                ConfigurationErrorKind::UnknownField {
                                    field_name: field_name.clone(),
                                },
                            ));
                            continue;
                        }
                        if !element
                            .options()
                            .iter()
                            .any(|option| &option.field_name == field_name)
                        {
                            errors.push(ConfigurationError::new(
                                name,
                                ConfigurationErrorKind::IncompatibleField {
                                    field_name: field_name.clone(),
                                },
                            ));
                            continue;
                        }
                        (name.to_string(), field_name.clone())
                    }
                    Some(BindingChoice::Create { machine_name, .. }) => {
                        let element_name = format!("{}_field_name", name);
                        let Some(create) = element.create() else {
                            errors.push(ConfigurationError::new(
                                name,
                                ConfigurationErrorKind::CreateNotAllowed,
                            ));
                            continue;
                        };
                        if !is_valid_machine_name(machine_name, create.max_length) {
                            errors.push(ConfigurationError::new(
                                element_name,
                                ConfigurationErrorKind::InvalidMachineName {
                                    machine_name: machine_name.clone(),
                                    max_length: create.max_length,
                                },
                            ));
                            continue;
                        }

                        let field_name = format!("{}{}", prefix, machine_name);
                        if self
                            .services
                            .fields
                            .field_exists(&descriptor.entity_type, &field_name)
                            .await?
                        {
                            errors.push(ConfigurationError::new(
                                element_name.clone(),
                                ConfigurationErrorKind::FieldNameCollision {
                                    field_name: field_name.clone(),
                                },
                            ));
                        }
                        (element_name, field_name)
                    }
                };

                let field_id = format!("{}.{}", descriptor.entity_type, field_name);
                let Some(first) = used.get(&field_id).cloned() else {
                    used.insert(field_id, element_name);
                    continue;
                };
                for offender in [first, element_name] {
                    if reported.insert(offender.clone()) {
                        errors.push(ConfigurationError::new(
                            offender,
                            ConfigurationErrorKind::DuplicateFieldBinding {
                                field_name: field_name.clone(),
                            },
                        ));
                    }
                }
            }
        }

        Ok(errors)
    }

    /// Validate, provision requested fields and store the accepted bindings
    /// in the settings of `transaction_type`. Nothing is changed when the
    /// submission has errors.
    pub async fn submit_configuration(
        &self,
        schema: &ConfigurationSchema,
        submission: &ConfigurationSubmission,
        transaction_type: &mut TransactionType,
    ) -> Result<()> {
        let span = info_span!(
            "transactor.configure",
            transaction_type = %transaction_type.id(),
            transactor = %self.definition.id
        );

        async move {
            let errors = self.validate_configuration(schema, submission).await?;
            if !errors.is_empty() {
                event!(Level::WARN, errors = errors.len(), "configuration rejected");
                return Err(TransactorError::InvalidConfiguration(errors));
            }

            let prefix = &self.services.config.field_prefix;
            let mut settings = transaction_type.plugin_settings().clone();

            for group in schema.groups() {
                for element in group.bindings() {
                    let name = element.name();
                    let descriptor = element.descriptor();

                    let (field_name, label) = match submission.binding(name) {
                        None => {
                            settings.remove(name);
                            continue;
                        }
                        Some(BindingChoice::Existing(field_name)) => {
                            (field_name.clone(), descriptor.title.clone())
                        }
                        Some(BindingChoice::Create {
                            label,
                            machine_name,
                        }) => {
                            let field_name = format!("{}{}", prefix, machine_name);
                            self.provisioner
                                .ensure_storage(descriptor, &field_name)
                                .await?;
                            (field_name, label.clone())
                        }
                    };

                    let bundles = self.owning_bundles(descriptor, transaction_type).await?;
                    let request = ProvisionRequest {
                        descriptor,
                        field_name: &field_name,
                        label: &label,
                        owning_type_id: transaction_type.id(),
                    };
                    self.provisioner
                        .attach_to_bundles(&request, &bundles)
                        .await?;

                    settings.insert(name.to_string(), Value::from(field_name));
                }

                for option in group.option_elements() {
                    if let Some(value) = submission.option_value(&option.name) {
                        settings.insert(option.name.clone(), value.clone());
                    }
                }
            }

            transaction_type.set_plugin_settings(settings);
            event!(Level::INFO, "transactor settings applied");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Bundles a bound field has to be attached to.
    async fn owning_bundles(
        &self,
        descriptor: &FieldBindingDescriptor,
        transaction_type: &TransactionType,
    ) -> Result<Vec<String>> {
        if descriptor.entity_type == TRANSACTION_ENTITY_TYPE {
            Ok(vec![transaction_type.id().to_string()])
        } else if descriptor.entity_type == transaction_type.target_entity_type() {
            transaction_type
                .applicable_bundles(self.services.bundles.as_ref())
                .await
        } else {
            Ok(Vec::new())
        }
    }
}
