//! CQL DDL generation from a table definition.
//!
//! This module renders the statements a Cassandra table-creation step needs
//! from a converted [`TableDefinition`]: `CREATE KEYSPACE`, `CREATE TABLE`
//! and one `CREATE INDEX` per single-field index.

use schema_core::{SchemaNode, TableDefinition};

/// Trait for generating DDL strings.
pub trait ToDdl {
    /// Column type of a field descriptor, e.g. `list<varchar>`.
    fn to_ddl(&self, descriptor: &SchemaNode) -> Option<String>;

    /// Generate a complete CREATE TABLE statement.
    fn to_create_table(&self, table_name: &str, definition: &TableDefinition) -> String;
}

/// Cassandra DDL generator.
#[derive(Debug, Clone, Default)]
pub struct CqlDdl {
    keyspace: Option<String>,
}

impl CqlDdl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Qualify every table name with a keyspace.
    pub fn with_keyspace(keyspace: impl Into<String>) -> Self {
        Self {
            keyspace: Some(keyspace.into()),
        }
    }

    /// Generate a CREATE KEYSPACE statement.
    pub fn create_keyspace(name: &str, class: &str, replication_factor: u32) -> String {
        format!(
            "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': '{}', 'replication_factor': {}}};",
            quote_ident(name),
            class.replace('\'', "''"),
            replication_factor
        )
    }

    /// Generate one CREATE INDEX statement per index.
    pub fn create_indexes(&self, table_name: &str, definition: &TableDefinition) -> Vec<String> {
        definition
            .indexes()
            .iter()
            .filter_map(|fields| fields.first())
            .map(|field| {
                if definition.field(field).is_none() {
                    tracing::warn!(
                        table = table_name,
                        column = %field,
                        "Index on a column without a field descriptor"
                    );
                }
                format!(
                    "CREATE INDEX IF NOT EXISTS ON {} ({});",
                    self.qualified(table_name),
                    quote_ident(field)
                )
            })
            .collect()
    }

    /// CREATE TABLE followed by its CREATE INDEX statements.
    pub fn statements(&self, table_name: &str, definition: &TableDefinition) -> Vec<String> {
        let mut statements = vec![self.to_create_table(table_name, definition)];
        statements.extend(self.create_indexes(table_name, definition));
        statements
    }

    fn qualified(&self, table_name: &str) -> String {
        match &self.keyspace {
            Some(keyspace) => format!("{}.{}", quote_ident(keyspace), quote_ident(table_name)),
            None => quote_ident(table_name),
        }
    }
}

impl ToDdl for CqlDdl {
    fn to_ddl(&self, descriptor: &SchemaNode) -> Option<String> {
        let column_type = descriptor.get("type").and_then(SchemaNode::as_str)?;
        let type_def = descriptor
            .get("typeDef")
            .and_then(SchemaNode::as_str)
            .unwrap_or_default();
        Some(format!("{column_type}{type_def}"))
    }

    fn to_create_table(&self, table_name: &str, definition: &TableDefinition) -> String {
        let mut column_defs: Vec<String> = definition
            .fields()
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|(name, descriptor)| match self.to_ddl(descriptor) {
                        Some(column_type) => {
                            Some(format!("  {} {}", quote_ident(name), column_type))
                        }
                        None => {
                            tracing::warn!(
                                table = table_name,
                                column = name,
                                "Column has no type, skipping"
                            );
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        for column in definition.key() {
            if definition.field(&column).is_none() {
                tracing::warn!(
                    table = table_name,
                    column = %column,
                    "Key column without a field descriptor"
                );
            }
        }
        if let Some(primary_key) = primary_key(definition.key_node()) {
            column_defs.push(format!("  {primary_key}"));
        }

        let mut statement = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            self.qualified(table_name),
            column_defs.join(",\n")
        );
        if let Some(order) = clustering_order(definition.options()) {
            statement.push_str(&format!(" WITH CLUSTERING ORDER BY ({order})"));
        }
        statement.push(';');
        statement
    }
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// The first key element is the partition key (itself a list when composite);
// the rest are clustering columns.
fn primary_key(key: Option<&SchemaNode>) -> Option<String> {
    let items = key?.to_list();
    let (partition, clustering) = items.split_first()?;

    let partition: Vec<String> = partition.names().iter().map(|n| quote_ident(n)).collect();
    let mut parts = vec![format!("({})", partition.join(", "))];
    parts.extend(
        clustering
            .iter()
            .flat_map(SchemaNode::names)
            .map(|n| quote_ident(&n)),
    );

    Some(format!("PRIMARY KEY ({})", parts.join(", ")))
}

fn clustering_order(options: Option<&SchemaNode>) -> Option<String> {
    let order = options?.get("clustering_order")?.as_mapping()?;
    let columns: Vec<String> = order
        .iter()
        .filter_map(|(column, direction)| {
            let direction = direction.as_str()?.to_uppercase();
            matches!(direction.as_str(), "ASC" | "DESC")
                .then(|| format!("{} {}", quote_ident(column), direction))
        })
        .collect();

    (!columns.is_empty()).then(|| columns.join(", "))
}
