//! Automatic `created_at` / `updated_at` columns.
//!
//! Controlled by a table's `options.timestamps`:
//!
//! - absent or `true`: both columns with default names
//! - `false`: no timestamp columns
//! - a mapping: `createdAt` / `updatedAt` rename a column; a falsy value
//!   disables that column

use schema_core::{Mapping, SchemaNode, TableDefinition};

pub const DEFAULT_CREATED_AT: &str = "created_at";
pub const DEFAULT_UPDATED_AT: &str = "updated_at";

/// Timestamp column names of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamps {
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Default for Timestamps {
    fn default() -> Self {
        Self {
            created_at: Some(DEFAULT_CREATED_AT.to_string()),
            updated_at: Some(DEFAULT_UPDATED_AT.to_string()),
        }
    }
}

impl Timestamps {
    pub fn disabled() -> Self {
        Self {
            created_at: None,
            updated_at: None,
        }
    }

    /// Resolve from a table definition's `options`.
    pub fn from_options(options: Option<&SchemaNode>) -> Self {
        match options.and_then(|o| o.get("timestamps")) {
            None => Self::default(),
            Some(SchemaNode::Mapping(overrides)) => Self {
                created_at: column(overrides, "createdAt", DEFAULT_CREATED_AT),
                updated_at: column(overrides, "updatedAt", DEFAULT_UPDATED_AT),
            },
            Some(flag) if flag.is_truthy() => Self::default(),
            Some(_) => Self::disabled(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.created_at.is_some() || self.updated_at.is_some()
    }

    /// Enabled column names.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.created_at
            .as_deref()
            .into_iter()
            .chain(self.updated_at.as_deref())
    }

    /// Add a `{type: timestamp}` field for each enabled column that the
    /// definition does not already declare.
    pub fn apply(&self, definition: TableDefinition) -> TableDefinition {
        self.columns().fold(definition, |definition, column| {
            if definition.field(column).is_some() {
                return definition;
            }
            let mut descriptor = Mapping::new();
            descriptor.insert("type", "timestamp");
            definition.with_field(column, SchemaNode::Mapping(descriptor))
        })
    }
}

fn column(overrides: &Mapping, key: &str, default: &str) -> Option<String> {
    match overrides.get(key) {
        None => Some(default.to_string()),
        Some(value) if value.is_truthy() => value.as_scalar().map(ToString::to_string),
        Some(_) => None,
    }
}
