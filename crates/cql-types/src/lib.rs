//! Cassandra type mapping and schema conversions for schema-core trees.
//!
//! This crate translates one declarative schema into the two artifacts the
//! adapter needs: a storage table definition and a structural validation
//! schema.
//!
//! # Modules
//!
//! - [`types`] - Generic ↔ storage type tables
//! - [`index`] - Index declaration normalization
//! - [`required`] - Required field set resolution
//! - [`forward`] - Declarative schema → storage table definition
//! - [`reverse`] - Declarative schema → validation schema
//! - [`ddl`] - CQL statements from a table definition
//!
//! # Example
//!
//! ```
//! use cql_types::{SchemaConverter, ValidatorConverter};
//! use schema_core::SchemaNode;
//!
//! let schema = SchemaNode::from_yaml(
//!     "{key: id, fields: {id: {type: string}, tags: {type: array, fields: {item: {type: string}}}}}",
//! )
//! .unwrap();
//!
//! let table = SchemaConverter::new().table_definition(&schema);
//! assert_eq!(table.field_type("tags"), Some("list"));
//! assert_eq!(table.type_def("tags"), Some("<varchar>"));
//!
//! let validation = ValidatorConverter::new().validation_schema(&schema);
//! assert_eq!(validation.property_type("id"), Some("string"));
//! ```

pub mod ddl;
pub mod forward;
pub mod index;
pub mod required;
pub mod reverse;
pub mod types;

pub use ddl::{CqlDdl, ToDdl};
pub use forward::SchemaConverter;
pub use index::{index_fields, normalize_indexes};
pub use required::resolve_required;
pub use reverse::ValidatorConverter;
pub use types::TypeMapper;
