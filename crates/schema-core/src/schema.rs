//! Schema definitions for the cql-adapter framework.
//!
//! ## Type Hierarchy
//!
//! **Input** (authored once per table):
//! - `SchemaSet` - Named declarative schemas loaded from a YAML or JSON file
//!
//! **Derived outputs** (one fresh tree per conversion):
//! - `TableDefinition` - Storage table definition (storage types, key, indexes, options)
//! - `ValidationSchema` - Structural validation schema (generic types, required set)
//!
//! Both outputs wrap the converted [`SchemaNode`] tree so that keys the
//! converters do not interpret (`options`, `ttl`, ...) survive untouched,
//! and expose typed accessors for the parts that consumers read.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::node::{Mapping, Scalar, SchemaNode};

// ============================================================================
// Error Types
// ============================================================================

/// Error type for schema operations.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Error reading schema file
    #[error("Failed to read schema file: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Error parsing JSON
    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Table not found in schema set
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// A node that must be a mapping is not one
    #[error("Expected a mapping for {0}")]
    NotAMapping(String),
}

// ============================================================================
// Output Types
// ============================================================================

/// Storage table definition produced by the schema converter.
///
/// Shape: `{ fields: {name: {type, typeDef?, ...}}, key: [..], indexes: [[..], ..], options }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TableDefinition(SchemaNode);

impl TableDefinition {
    /// Wrap an already-converted tree.
    pub fn from_node(node: SchemaNode) -> Self {
        Self(node)
    }

    pub fn as_node(&self) -> &SchemaNode {
        &self.0
    }

    pub fn into_node(self) -> SchemaNode {
        self.0
    }

    /// Field descriptors keyed by field name.
    pub fn fields(&self) -> Option<&Mapping> {
        self.0.get("fields").and_then(SchemaNode::as_mapping)
    }

    /// Descriptor of a single field.
    pub fn field(&self, name: &str) -> Option<&SchemaNode> {
        self.fields().and_then(|f| f.get(name))
    }

    /// Storage type of a field.
    pub fn field_type(&self, name: &str) -> Option<&str> {
        self.field(name)
            .and_then(|f| f.get("type"))
            .and_then(SchemaNode::as_str)
    }

    /// Collection element signature of a field, e.g. `<varchar,int>`.
    pub fn type_def(&self, name: &str) -> Option<&str> {
        self.field(name)
            .and_then(|f| f.get("typeDef"))
            .and_then(SchemaNode::as_str)
    }

    /// Raw key node; the first element may itself be a list (composite
    /// partition key).
    pub fn key_node(&self) -> Option<&SchemaNode> {
        self.0.get("key")
    }

    /// Key field names in order, flattened.
    pub fn key(&self) -> Vec<String> {
        self.key_node().map(SchemaNode::names).unwrap_or_default()
    }

    /// Single-field index declarations.
    pub fn indexes(&self) -> Vec<Vec<String>> {
        self.0
            .get("indexes")
            .and_then(SchemaNode::as_sequence)
            .map(|entries| entries.iter().map(SchemaNode::names).collect())
            .unwrap_or_default()
    }

    pub fn options(&self) -> Option<&SchemaNode> {
        self.0.get("options")
    }

    /// Key and index columns that have no field descriptor, in first
    /// occurrence order.
    pub fn undeclared_columns(&self) -> Vec<String> {
        let mut undeclared: Vec<String> = Vec::new();
        for name in self.key().into_iter().chain(self.indexes().into_iter().flatten()) {
            if self.field(&name).is_none() && !undeclared.contains(&name) {
                undeclared.push(name);
            }
        }
        undeclared
    }

    /// Return a definition with one more field descriptor. An existing
    /// descriptor of the same name is replaced.
    pub fn with_field(self, name: impl Into<String>, descriptor: SchemaNode) -> Self {
        match self.0 {
            SchemaNode::Mapping(mut root) => {
                match root.get_mut("fields").and_then(SchemaNode::as_mapping_mut) {
                    Some(fields) => {
                        fields.insert(name, descriptor);
                    }
                    None => {
                        let mut fields = Mapping::new();
                        fields.insert(name, descriptor);
                        root.insert("fields", fields);
                    }
                }
                Self(SchemaNode::Mapping(root))
            }
            other => Self(other),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.0.to_json()
    }
}

/// Structural validation schema produced by the validator converter.
///
/// Shape: `{ properties: {name: {type, ...}}, required: [..], key }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationSchema(SchemaNode);

impl ValidationSchema {
    /// Wrap an already-converted tree.
    pub fn from_node(node: SchemaNode) -> Self {
        Self(node)
    }

    pub fn as_node(&self) -> &SchemaNode {
        &self.0
    }

    pub fn into_node(self) -> SchemaNode {
        self.0
    }

    /// Property descriptors keyed by property name.
    pub fn properties(&self) -> Option<&Mapping> {
        self.0.get("properties").and_then(SchemaNode::as_mapping)
    }

    pub fn property(&self, name: &str) -> Option<&SchemaNode> {
        self.properties().and_then(|p| p.get(name))
    }

    /// Generic type of a property.
    pub fn property_type(&self, name: &str) -> Option<&str> {
        self.property(name)
            .and_then(|p| p.get("type"))
            .and_then(SchemaNode::as_str)
    }

    /// Required property names. Set semantics: order is not meaningful.
    pub fn required(&self) -> BTreeSet<String> {
        self.0
            .get("required")
            .map(SchemaNode::names)
            .unwrap_or_default()
            .into_iter()
            .collect()
    }

    /// Key field names (a scalar key is promoted to a one-element list).
    pub fn key(&self) -> Vec<String> {
        self.0.get("key").map(SchemaNode::names).unwrap_or_default()
    }

    /// Default time-to-live in seconds, `0` when absent.
    pub fn ttl(&self) -> u64 {
        match self.0.get("ttl").and_then(SchemaNode::as_scalar) {
            Some(Scalar::Int(i)) if *i > 0 => *i as u64,
            Some(Scalar::Float(f)) if *f > 0.0 => *f as u64,
            _ => 0,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.0.to_json()
    }
}

// ============================================================================
// Schema Set
// ============================================================================

/// Named table schemas loaded from one file.
///
/// The file is a mapping from table name to declarative schema:
///
/// ```yaml
/// users:
///   key: id
///   properties:
///     id: { type: string }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaSet {
    tables: Mapping,
}

impl SchemaSet {
    /// Load a schema set from a file (`.json` as JSON, otherwise YAML).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let node = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => SchemaNode::from_json(&content)?,
            _ => SchemaNode::from_yaml(&content)?,
        };
        Self::from_node(node)
    }

    /// Parse a schema set from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        Self::from_node(SchemaNode::from_yaml(yaml)?)
    }

    fn from_node(node: SchemaNode) -> Result<Self, SchemaError> {
        match node {
            SchemaNode::Mapping(tables) => Ok(Self { tables }),
            _ => Err(SchemaError::NotAMapping("schema set".to_string())),
        }
    }

    /// Get a table schema by name.
    pub fn get_table(&self, name: &str) -> Option<&SchemaNode> {
        self.tables.get(name)
    }

    /// Get a table schema by name, failing when it is missing.
    pub fn table(&self, name: &str) -> Result<&SchemaNode, SchemaError> {
        self.get_table(name)
            .ok_or_else(|| SchemaError::TableNotFound(name.to_string()))
    }

    /// Get all table names in file order.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
