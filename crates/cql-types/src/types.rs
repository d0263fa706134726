//! Generic ↔ storage type tables.
//!
//! Generic types are the logical tokens used by validation schemas
//! (`string`, `integer`, `array`, ...). Storage types are Cassandra column
//! types (`varchar`, `int`, `list`, ...).
//!
//! The two tables are not inverses of each other: several storage types
//! collapse onto one generic type, so a storage → generic → storage round
//! trip is lossy (`decimal` → `number` → `double`). Tokens missing from a
//! table pass through unchanged.

use schema_core::{Scalar, SchemaNode};

/// Generic → storage type names.
pub const GENERIC_TO_STORAGE: &[(&str, &str)] = &[
    ("array", "list"),
    ("boolean", "boolean"),
    ("integer", "int"),
    ("number", "double"),
    ("object", "map"),
    ("string", "varchar"),
];

/// Storage → generic type names.
pub const STORAGE_TO_GENERIC: &[(&str, &str)] = &[
    ("ascii", "string"),
    ("bigint", "number"),
    ("blob", "string"),
    ("boolean", "boolean"),
    ("counter", "number"),
    ("decimal", "number"),
    ("double", "number"),
    ("float", "number"),
    ("inet", "string"),
    ("int", "number"),
    ("list", "array"),
    ("map", "object"),
    ("set", "array"),
    ("text", "string"),
    ("timestamp", "string"),
    ("timeuuid", "string"),
    ("uuid", "string"),
    ("varchar", "string"),
    ("varint", "number"),
];

/// Storage types that need an element signature (`typeDef`).
pub const COLLECTION_TYPES: &[&str] = &["map", "list", "set"];

/// One direction of the type tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMapper {
    table: &'static [(&'static str, &'static str)],
}

impl TypeMapper {
    /// Generic → storage.
    pub const fn generic_to_storage() -> Self {
        Self {
            table: GENERIC_TO_STORAGE,
        }
    }

    /// Storage → generic.
    pub const fn storage_to_generic() -> Self {
        Self {
            table: STORAGE_TO_GENERIC,
        }
    }

    /// Table entry for a type token, if any.
    pub fn lookup(&self, type_name: &str) -> Option<&'static str> {
        self.table
            .iter()
            .find(|(from, _)| *from == type_name)
            .map(|(_, to)| *to)
    }

    /// Translate a type token, falling back to the token itself.
    pub fn translate<'a>(&self, type_name: &'a str) -> &'a str {
        match self.lookup(type_name) {
            Some(mapped) => mapped,
            None => type_name,
        }
    }

    /// Translate a `type` node. Only string scalars are translated; any
    /// other node is returned as is.
    pub fn translate_node(&self, node: &SchemaNode) -> SchemaNode {
        match node {
            SchemaNode::Scalar(Scalar::String(s)) => SchemaNode::string(self.translate(s)),
            other => other.clone(),
        }
    }
}

/// Whether a storage type is a collection (`map`, `list` or `set`).
pub fn is_collection(storage_type: &str) -> bool {
    COLLECTION_TYPES.contains(&storage_type)
}
