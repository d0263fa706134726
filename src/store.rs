//! Schema application backends.
//!
//! This module defines the [`SchemaStore`] trait, the boundary between the
//! adapter and whatever creates tables in Cassandra. The adapter only
//! produces table definitions; applying them is the store's job.

use anyhow::Result;
use async_trait::async_trait;
use cql_types::CqlDdl;
use schema_core::TableDefinition;
use std::sync::{Mutex, PoisonError};

/// Trait for table creation backends.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Create or update the table `name` from its definition.
    async fn apply_schema(&self, name: &str, definition: &TableDefinition) -> Result<()>;
}

/// A table definition accepted by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedSchema {
    pub name: String,
    pub definition: TableDefinition,
    /// CQL statements the definition renders to
    pub statements: Vec<String>,
}

/// In-memory implementation of SchemaStore.
///
/// Records every applied definition together with its CQL. Used for dry
/// runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ddl: CqlDdl,
    applied: Mutex<Vec<AppliedSchema>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render statements qualified with a keyspace.
    pub fn with_keyspace(keyspace: impl Into<String>) -> Self {
        Self {
            ddl: CqlDdl::with_keyspace(keyspace),
            applied: Mutex::default(),
        }
    }

    /// Definitions applied so far, in completion order. Readable even
    /// after a writer panicked while holding the lock.
    pub fn applied(&self) -> Vec<AppliedSchema> {
        self.applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent definition applied for a table.
    pub fn get(&self, name: &str) -> Option<AppliedSchema> {
        self.applied().into_iter().rev().find(|a| a.name == name)
    }
}

#[async_trait]
impl SchemaStore for MemoryStore {
    async fn apply_schema(&self, name: &str, definition: &TableDefinition) -> Result<()> {
        let applied = AppliedSchema {
            name: name.to_string(),
            definition: definition.clone(),
            statements: self.ddl.statements(name, definition),
        };

        self.applied
            .lock()
            .map_err(|_| anyhow::anyhow!("Memory store lock poisoned"))?
            .push(applied);
        tracing::info!("Applied schema for table {}", name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema_core::SchemaNode;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_memory_store_records_definitions() {
        let store = MemoryStore::with_keyspace("app");
        let definition = TableDefinition::from_node(
            SchemaNode::from_yaml("{key: [id], fields: {id: {type: varchar}}, indexes: [[id]]}")
                .unwrap(),
        );

        store.apply_schema("users", &definition).await.unwrap();

        let applied = store.get("users").expect("users should be applied");
        assert_eq!(applied.definition, definition);
        assert_eq!(applied.statements.len(), 2);
        assert!(applied.statements[0].starts_with("CREATE TABLE IF NOT EXISTS \"app\".\"users\""));
        assert!(store.get("posts").is_none());
    }

    #[tokio::test]
    async fn test_applied_survives_poisoned_lock() {
        let store = Arc::new(MemoryStore::new());
        let definition = TableDefinition::from_node(
            SchemaNode::from_yaml("{key: [id], fields: {id: {type: varchar}}}").unwrap(),
        );
        store.apply_schema("users", &definition).await.unwrap();

        let writer = Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = writer.applied.lock().unwrap();
            panic!("writer failed while holding the lock");
        })
        .join();
        assert!(store.applied.is_poisoned());

        assert_eq!(store.applied().len(), 1);
        assert!(store.get("users").is_some());
        assert!(store.apply_schema("posts", &definition).await.is_err());
    }
}
