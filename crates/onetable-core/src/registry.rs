use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    table::Table,
};
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error as ThisError;

///
/// TableRegistryError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum TableRegistryError {
    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error("table '{0}' already registered")]
    TableAlreadyRegistered(String),
}

impl TableRegistryError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::TableNotFound(_) => ErrorClass::NotFound,
            Self::TableAlreadyRegistered(_) => ErrorClass::Configuration,
        }
    }
}

impl From<TableRegistryError> for InternalError {
    fn from(err: TableRegistryError) -> Self {
        Self::new(err.class(), ErrorOrigin::Setup, err.to_string())
    }
}

///
/// TableRegistry
///
/// Opened tables keyed by name. Owned by the application's setup phase and
/// handed to request handlers; tables are shared through `Arc`.
///

#[derive(Debug, Default)]
pub struct TableRegistry {
    tables: BTreeMap<String, Arc<Table>>,
}

impl TableRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, table: Table) -> Result<Arc<Table>, TableRegistryError> {
        let name = table.name().to_string();
        if self.tables.contains_key(&name) {
            return Err(TableRegistryError::TableAlreadyRegistered(name));
        }

        let table = Arc::new(table);
        self.tables.insert(name, Arc::clone(&table));

        Ok(table)
    }

    pub fn try_get(&self, name: &str) -> Result<Arc<Table>, TableRegistryError> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| TableRegistryError::TableNotFound(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Table>)> {
        self.tables.iter().map(|(name, table)| (name.as_str(), table))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryClient, fixtures::open_table};

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = TableRegistry::new();
        registry
            .register(open_table(Arc::new(MemoryClient::new())))
            .expect("first");

        let err = registry
            .register(open_table(Arc::new(MemoryClient::new())))
            .expect_err("second");
        assert_eq!(err, TableRegistryError::TableAlreadyRegistered("app".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_by_name() {
        let mut registry = TableRegistry::new();
        registry
            .register(open_table(Arc::new(MemoryClient::new())))
            .expect("register");

        assert_eq!(registry.try_get("app").expect("present").name(), "app");
        assert_eq!(
            InternalError::from(registry.try_get("other").expect_err("absent")).class,
            ErrorClass::NotFound
        );
    }
}
