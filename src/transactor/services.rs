use crate::auth::Actor;
use crate::config::TransactorConfig;
use crate::field::{FieldProvisioner, FieldResolver};
use crate::schema::{BundleInfo, DisplayRepository, FieldManager};
use crate::storage::{RecordStorage, TransactionStorage};
use std::sync::Arc;

/// Collaborators injected into every transactor instance.
#[derive(Clone)]
pub struct TransactorServices {
    pub records: Arc<dyn RecordStorage>,
    pub transactions: Arc<dyn TransactionStorage>,
    pub fields: Arc<dyn FieldManager>,
    pub bundles: Arc<dyn BundleInfo>,
    pub displays: Arc<dyn DisplayRepository>,
    /// Identity the configuration schema is built for
    pub actor: Actor,
    pub config: TransactorConfig,
}

impl TransactorServices {
    /// Same collaborators acting as another actor
    pub fn with_actor(&self, actor: Actor) -> Self {
        Self {
            actor,
            ..self.clone()
        }
    }

    pub fn resolver(&self) -> FieldResolver {
        FieldResolver::new(self.fields.clone())
    }

    pub fn provisioner(&self) -> FieldProvisioner {
        FieldProvisioner::new(
            self.fields.clone(),
            self.displays.clone(),
            self.config.display_mode.clone(),
        )
    }
}
