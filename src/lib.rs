//! CQL Adapter Library
//!
//! Declarative table schemas for Cassandra: one schema per table is turned
//! into a storage table definition and a structural validation schema, and
//! the definitions are applied to a keyspace through a [`SchemaStore`].
//!
//! # Features
//!
//! - Schema conversion: generic types translated to CQL, collection
//!   signatures, normalized indexes, resolved required fields
//! - Sync: concurrent table application, first error wins, no rollback
//! - Table handles: record validation, key extraction, projection and
//!   automatic timestamps
//!
//! # Crates
//!
//! - `schema_core` - Schema trees, table definitions, validation schemas
//! - `cql_types` - Type mapping, converters and CQL DDL
//!
//! # CLI Usage
//!
//! ```bash
//! # Print the converted schemas of one table
//! cql-adapter convert --schema tables.yaml --table users
//!
//! # Print CQL for every table
//! cql-adapter ddl --schema tables.yaml --keyspace app
//!
//! # Dry-run sync
//! cql-adapter sync --schema tables.yaml --config adapter.yaml
//! ```

pub mod adapter;
pub mod config;
pub mod store;
pub mod table;
pub mod timestamps;
pub mod validate;

pub use adapter::Adapter;
pub use config::{AdapterConfig, Hosts, Migration, Replication};
pub use store::{AppliedSchema, MemoryStore, SchemaStore};
pub use table::Table;
pub use timestamps::Timestamps;
pub use validate::{RecordValidator, StructuralValidator, Violation};
