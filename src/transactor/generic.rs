use super::{Transactor, TransactorBase, TransactorDefinition};
use crate::core::{FieldValue, Result, Text};
use crate::field::FieldDeclaration;
use crate::schema::ENTITY_REFERENCE;
use crate::transaction::Transaction;
use async_trait::async_trait;
use log::warn;
use tracing::{Level, event};

pub const GENERIC_TRANSACTOR: &str = "transaction_generic";

/// Settings key of the log message field on transactions
const LOG_MESSAGE: &str = "log_message";
/// Settings key of the last transaction field on target records
const LAST_TRANSACTION: &str = "last_transaction";

/// Multipurpose transactor recording the last executed transaction on the
/// target record.
pub struct GenericTransactor {
    base: TransactorBase,
}

impl GenericTransactor {
    pub fn new(base: TransactorBase) -> Self {
        Self { base }
    }

    pub fn definition() -> TransactorDefinition {
        TransactorDefinition::new(GENERIC_TRANSACTOR, "Generic")
            .description("A simple multipurpose transactor.")
            .transaction_field(
                FieldDeclaration::new(LOG_MESSAGE, "string", "Log message")
                    .description("A log message with details about the transaction."),
            )
            .target_entity_field(
                FieldDeclaration::new(LAST_TRANSACTION, ENTITY_REFERENCE, "Last transaction")
                    .description(
                        "A reference field in the target entity type to update with a \
                         reference to the last executed transaction of this type.",
                    ),
            )
    }
}

#[async_trait]
impl Transactor for GenericTransactor {
    fn base(&self) -> &TransactorBase {
        &self.base
    }

    async fn execute_transaction(
        &self,
        transaction: &mut Transaction,
        last_executed: Option<&Transaction>,
    ) -> Result<bool> {
        if !self
            .base
            .execute_transaction(transaction, last_executed)
            .await?
        {
            return Ok(false);
        }

        let Some(field_name) = self.base.setting_str(LAST_TRANSACTION) else {
            return Ok(true);
        };
        let (Some(target), Some(reference)) = (transaction.target(), transaction.reference())
        else {
            return Ok(true);
        };

        let services = self.base.services();
        let Some(mut record) = services.records.load(&target.entity_type, target.id).await? else {
            return Ok(true);
        };

        let has_field = services
            .fields
            .load_field(&record.entity_type, &record.bundle, field_name)
            .await?
            .is_some();
        if !has_field {
            warn!(
                "Field {} is not attached to {} bundle {}, last transaction not recorded",
                field_name, record.entity_type, record.bundle
            );
            return Ok(true);
        }

        if let Some(previous) = last_executed.and_then(Transaction::id) {
            event!(Level::DEBUG, previous, "replacing last transaction reference");
        }

        record.set(field_name, FieldValue::Reference(reference));
        services.records.save(&record).await?;
        Ok(true)
    }

    async fn transaction_details(
        &self,
        transaction: &Transaction,
        langcode: Option<&str>,
    ) -> Result<Vec<Text>> {
        let message = self
            .base
            .setting_str(LOG_MESSAGE)
            .and_then(|field_name| transaction.field(field_name))
            .and_then(FieldValue::as_text)
            .filter(|message| !message.is_empty());

        Ok(message
            .map(|message| {
                vec![
                    Text::new("Log message: @message")
                        .arg("@message", message)
                        .langcode(langcode),
                ]
            })
            .unwrap_or_default())
    }
}
