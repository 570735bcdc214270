//! Run-scoped table store.

use std::collections::BTreeMap;

use polars::prelude::DataFrame;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("table store already holds entity {entity}")]
    AlreadyPopulated { entity: String },
    #[error("table store has no entry for entity {entity}")]
    Missing { entity: String },
}

/// Entity name to materialized table.
///
/// Each slot is written once and is read-only afterwards; there is no mutable
/// access to a stored table. Iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct TableStore {
    tables: BTreeMap<String, DataFrame>,
    order: Vec<String>,
}

impl TableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `table` under `entity`. Fails if the slot is already populated.
    pub fn insert(&mut self, entity: impl Into<String>, table: DataFrame) -> Result<(), StoreError> {
        let entity = entity.into();
        if self.tables.contains_key(&entity) {
            return Err(StoreError::AlreadyPopulated { entity });
        }
        self.order.push(entity.clone());
        self.tables.insert(entity, table);
        Ok(())
    }

    pub fn get(&self, entity: &str) -> Option<&DataFrame> {
        self.tables.get(entity)
    }

    pub fn require(&self, entity: &str) -> Result<&DataFrame, StoreError> {
        self.get(entity).ok_or_else(|| StoreError::Missing {
            entity: entity.to_string(),
        })
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.tables.contains_key(entity)
    }

    /// Entity names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataFrame)> + '_ {
        self.order
            .iter()
            .filter_map(|name| self.tables.get(name).map(|table| (name.as_str(), table)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Consumes the store, yielding tables in insertion order.
    pub fn into_tables(mut self) -> Vec<(String, DataFrame)> {
        self.order
            .into_iter()
            .filter_map(|name| self.tables.remove(&name).map(|table| (name, table)))
            .collect()
    }
}
