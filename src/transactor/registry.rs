use super::{
    GenericTransactor, Transactor, TransactorBase, TransactorDefinition, TransactorServices,
};
use crate::core::{Result, TransactorError};
use crate::transaction::TransactionType;
use std::collections::BTreeMap;
use tracing::{Level, event};

/// Builds a plugin instance around its shared base.
pub type TransactorFactory = Box<dyn Fn(TransactorBase) -> Box<dyn Transactor> + Send + Sync>;

struct RegisteredTransactor {
    definition: TransactorDefinition,
    factory: TransactorFactory,
}

/// Available transactor plugins, keyed by id.
pub struct TransactorRegistry {
    services: TransactorServices,
    transactors: BTreeMap<String, RegisteredTransactor>,
}

impl TransactorRegistry {
    pub fn new(services: TransactorServices) -> Self {
        Self {
            services,
            transactors: BTreeMap::new(),
        }
    }

    /// Registry holding the built-in transactors
    pub fn with_default_transactors(services: TransactorServices) -> Self {
        let mut registry = Self::new(services);
        registry.register(GenericTransactor::definition(), |base| {
            Box::new(GenericTransactor::new(base))
        });
        registry
    }

    /// Register a plugin. A later registration under the same id replaces
    /// the earlier one.
    pub fn register<F>(&mut self, definition: TransactorDefinition, factory: F)
    where
        F: Fn(TransactorBase) -> Box<dyn Transactor> + Send + Sync + 'static,
    {
        event!(Level::DEBUG, transactor = %definition.id, "transactor registered");
        self.transactors.insert(
            definition.id.clone(),
            RegisteredTransactor {
                definition,
                factory: Box::new(factory),
            },
        );
    }

    pub fn definitions(&self) -> impl Iterator<Item = &TransactorDefinition> {
        self.transactors.values().map(|t| &t.definition)
    }

    pub fn definition(&self, transactor_id: &str) -> Option<&TransactorDefinition> {
        self.transactors.get(transactor_id).map(|t| &t.definition)
    }

    pub fn services(&self) -> &TransactorServices {
        &self.services
    }

    /// Instance of `transactor_id` bound to `transaction_type`.
    pub fn resolve(
        &self,
        transactor_id: &str,
        transaction_type: &TransactionType,
    ) -> Result<Box<dyn Transactor>> {
        let registered = self
            .transactors
            .get(transactor_id)
            .ok_or_else(|| TransactorError::UnknownTransactor(transactor_id.to_string()))?;

        let base = TransactorBase::new(
            registered.definition.clone(),
            transaction_type.clone(),
            self.services.clone(),
        );
        Ok((registered.factory)(base))
    }

    /// Instance of the transactor configured on `transaction_type`.
    pub fn for_type(&self, transaction_type: &TransactionType) -> Result<Box<dyn Transactor>> {
        let transactor_id = transaction_type
            .plugin_id()
            .ok_or_else(|| TransactorError::MissingTransactor(transaction_type.id().to_string()))?;
        self.resolve(transactor_id, transaction_type)
    }
}

impl std::fmt::Debug for TransactorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactorRegistry")
            .field("transactors", &self.transactors.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Actor;
    use crate::config::TransactorConfig;
    use crate::storage::MemoryBackend;
    use crate::transactor::GENERIC_TRANSACTOR;

    fn registry() -> TransactorRegistry {
        let backend = MemoryBackend::new();
        TransactorRegistry::with_default_transactors(
            backend.services(Actor::admin("admin"), TransactorConfig::default()),
        )
    }

    #[test]
    fn test_default_transactors() {
        let registry = registry();
        let ids: Vec<_> = registry.definitions().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec![GENERIC_TRANSACTOR]);
    }

    #[test]
    fn test_resolve_binds_type() {
        let registry = registry();
        let mut transaction_type = TransactionType::new("restock", "Restock", "inventory_item");
        transaction_type.set_plugin_id(GENERIC_TRANSACTOR);

        let transactor = registry.for_type(&transaction_type).unwrap();
        assert_eq!(transactor.definition().id, GENERIC_TRANSACTOR);
        assert_eq!(transactor.transaction_type().id(), "restock");
    }

    #[test]
    fn test_unknown_and_missing_transactor() {
        let registry = registry();
        let mut transaction_type = TransactionType::new("restock", "Restock", "inventory_item");
        assert!(matches!(
            registry.for_type(&transaction_type),
            Err(TransactorError::MissingTransactor(id)) if id == "restock"
        ));

        transaction_type.set_plugin_id("nope");
        assert!(matches!(
            registry.for_type(&transaction_type),
            Err(TransactorError::UnknownTransactor(id)) if id == "nope"
        ));
    }
}
