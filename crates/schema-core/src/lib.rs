//! Core schema types for the cql-adapter framework.
//!
//! This crate provides the foundational types used across the adapter,
//! including:
//!
//! - [`SchemaNode`] - Declarative schema tree (`Scalar | Sequence | Mapping`)
//! - [`Mapping`] - Ordered, unique-key mapping used inside the tree
//! - [`Validator`] - Named predicate stored under a field's `rule.validator`
//! - [`TableDefinition`] / [`ValidationSchema`] - Typed views over converted trees
//! - [`SchemaSet`] - Named table schemas loaded from YAML or JSON
//!
//! # Architecture
//!
//! ```text
//! schema-core (this crate)
//!    │
//!    ├─── cql-types     (type tables, schema/validator converters, CQL DDL)
//!    └─── cql-adapter   (registry, sync orchestration, table handles)
//! ```
//!
//! # Example
//!
//! ```rust
//! use schema_core::SchemaNode;
//!
//! let schema = SchemaNode::from_yaml("{key: id, fields: {id: {type: string}}}").unwrap();
//! assert_eq!(schema.get("key").and_then(SchemaNode::as_str), Some("id"));
//! ```

pub mod node;
pub mod schema;
pub mod validator;

// Re-exports for convenience
pub use node::{Mapping, Scalar, SchemaNode};
pub use schema::{SchemaError, SchemaSet, TableDefinition, ValidationSchema};
pub use validator::{is_truthy_json, Validator};
