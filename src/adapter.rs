//! Schema registry and sync orchestration.
//!
//! Tables are declared with [`Adapter::define`] and created with
//! [`Adapter::sync`], which converts every pending schema and applies the
//! resulting definitions through a [`SchemaStore`] concurrently.

use anyhow::Context;
use cql_types::{SchemaConverter, ValidatorConverter};
use futures::future::join_all;
use schema_core::{Mapping, SchemaNode, SchemaSet};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::AdapterConfig;
use crate::store::SchemaStore;
use crate::table::Table;
use crate::timestamps::Timestamps;
use crate::validate::{RecordValidator, StructuralValidator};

/// Declared schemas and the tables synced from them.
pub struct Adapter {
    config: AdapterConfig,
    schemas: Mapping,
    tables: HashMap<String, Table>,
    schema_converter: SchemaConverter,
    validator_converter: ValidatorConverter,
    validator: Arc<dyn RecordValidator>,
}

impl Default for Adapter {
    fn default() -> Self {
        Self::new(AdapterConfig::default())
    }
}

impl Adapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self {
            config,
            schemas: Mapping::new(),
            tables: HashMap::new(),
            schema_converter: SchemaConverter::new(),
            validator_converter: ValidatorConverter::new(),
            validator: Arc::new(StructuralValidator),
        }
    }

    /// Use a different record validator for tables synced from now on.
    pub fn with_validator(mut self, validator: Arc<dyn RecordValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Declare a table. A later definition under the same name replaces
    /// the earlier one and marks the table for the next sync.
    pub fn define(&mut self, name: impl Into<String>, schema: SchemaNode) -> &mut Self {
        let name = name.into();
        if self.tables.remove(&name).is_some() {
            tracing::debug!("Table {} redefined, will be synced again", name);
        }
        self.schemas.insert(name, schema);
        self
    }

    /// Declare every table of a schema set.
    pub fn define_all(&mut self, schemas: &SchemaSet) -> &mut Self {
        for (name, schema) in schemas.iter() {
            self.define(name, schema.clone());
        }
        self
    }

    /// The declarative schema of a defined table.
    pub fn schema(&self, name: &str) -> Option<&SchemaNode> {
        self.schemas.get(name)
    }

    /// Names of defined tables in definition order.
    pub fn defined(&self) -> Vec<&str> {
        self.schemas.keys().collect()
    }

    /// Names of defined tables not synced yet.
    pub fn pending(&self) -> Vec<&str> {
        self.schemas
            .keys()
            .filter(|name| !self.tables.contains_key(*name))
            .collect()
    }

    /// Convert a schema into a table handle without applying it.
    ///
    /// The table definition gets the timestamp columns resolved from its
    /// `options.timestamps`.
    pub fn prepare(&self, name: &str, schema: &SchemaNode) -> Table {
        let definition = self.schema_converter.table_definition(schema);
        let timestamps = Timestamps::from_options(definition.options());
        let definition = timestamps.apply(definition);
        let validation = self.validator_converter.validation_schema(schema);

        Table::new(name, definition, validation, timestamps)
            .with_validator(Arc::clone(&self.validator))
    }

    /// Apply every pending table through `store`, one task per table.
    ///
    /// Waits for all applications to finish. Tables that were applied
    /// become available through [`Adapter::table`] even when another one
    /// failed; the first failure in definition order is returned. Nothing
    /// is rolled back.
    pub async fn sync(&mut self, store: Arc<dyn SchemaStore>) -> anyhow::Result<Vec<String>> {
        let pending: Vec<Table> = self
            .pending()
            .into_iter()
            .filter_map(|name| self.schemas.get(name).map(|schema| self.prepare(name, schema)))
            .collect();

        if pending.is_empty() {
            tracing::debug!("No tables to sync");
            return Ok(Vec::new());
        }
        tracing::info!("Syncing {} tables", pending.len());

        let handles: Vec<_> = pending
            .into_iter()
            .map(|table| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let result = store
                        .apply_schema(table.name(), table.definition())
                        .await
                        .with_context(|| {
                            format!("Failed to apply schema for table '{}'", table.name())
                        });
                    (table, result)
                })
            })
            .collect();

        let mut synced = Vec::new();
        let mut first_error = None;

        for joined in join_all(handles).await {
            match joined {
                Ok((table, Ok(()))) => {
                    synced.push(table.name().to_string());
                    self.tables.insert(table.name().to_string(), table);
                }
                Ok((table, Err(e))) => {
                    tracing::warn!("Table {} was not synced: {:#}", table.name(), e);
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    let e = anyhow::Error::new(e).context("Schema sync task failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                tracing::info!("Synced tables: {}", synced.join(", "));
                Ok(synced)
            }
        }
    }

    /// A synced table.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn is_synced(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn schema(yaml: &str) -> SchemaNode {
        SchemaNode::from_yaml(yaml).unwrap()
    }

    #[test]
    fn test_define_replaces() {
        let mut adapter = Adapter::default();
        adapter
            .define("users", schema("{key: id}"))
            .define("posts", schema("{key: id}"))
            .define("users", schema("{key: email}"));

        assert_eq!(adapter.defined(), vec!["users", "posts"]);
        assert_eq!(adapter.schema("users"), Some(&schema("{key: email}")));
    }

    #[test]
    fn test_prepare_adds_timestamps() {
        let adapter = Adapter::default();
        let table = adapter.prepare(
            "users",
            &schema("{key: id, properties: {id: {type: string}}}"),
        );

        assert_eq!(table.definition().field_type("id"), Some("varchar"));
        assert_eq!(table.definition().field_type("created_at"), Some("timestamp"));
        assert_eq!(table.definition().field_type("updated_at"), Some("timestamp"));
        assert_eq!(table.fields(), ["id"]);
    }

    #[test]
    fn test_prepare_without_timestamps() {
        let adapter = Adapter::default();
        let table = adapter.prepare(
            "events",
            &schema("{key: id, properties: {id: {type: string}}, options: {timestamps: false}}"),
        );

        assert!(table.definition().field("created_at").is_none());
        assert!(!table.timestamps().is_enabled());
    }

    #[tokio::test]
    async fn test_sync_skips_synced_tables() {
        let store = Arc::new(MemoryStore::new());
        let mut adapter = Adapter::default();
        adapter.define("users", schema("{key: id, properties: {id: {type: string}}}"));

        let synced = adapter.sync(store.clone()).await.unwrap();
        assert_eq!(synced, vec!["users"]);
        assert!(adapter.is_synced("users"));

        adapter.define("posts", schema("{key: id, properties: {id: {type: string}}}"));
        let synced = adapter.sync(store.clone()).await.unwrap();
        assert_eq!(synced, vec!["posts"]);
        assert_eq!(store.applied().len(), 2);

        assert!(adapter.sync(store.clone()).await.unwrap().is_empty());
    }
}
