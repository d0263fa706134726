//! Index declaration normalization.
//!
//! Schemas declare indexes in several legacy shapes. Each entry is reduced
//! to its field set:
//!
//! | Entry | Field set |
//! |---|---|
//! | `[{a: 1}]` | keys of the first mapping |
//! | `[a]` | the scalars themselves |
//! | `{fields: [a]}` / `{fields: {a: 1}}` | the unwrapped `fields` value |
//! | `{a: 1}` | the mapping's keys |
//! | `a` | `[a]` |
//!
//! Only single-field indexes are supported: entries whose field set does
//! not have exactly one element are dropped without error.

use schema_core::{Mapping, SchemaNode};

/// Normalize an `indexes` value into a sequence of one-field sequences.
///
/// A value that is not a sequence is treated as a single entry.
pub fn normalize_indexes(indexes: &SchemaNode) -> SchemaNode {
    let normalized = indexes
        .to_list()
        .iter()
        .filter_map(|entry| {
            let fields = index_fields(entry);
            if fields.len() == 1 {
                Some(SchemaNode::Sequence(fields))
            } else {
                tracing::debug!(
                    field_count = fields.len(),
                    "dropping index declaration without exactly one field"
                );
                None
            }
        })
        .collect();

    SchemaNode::Sequence(normalized)
}

/// Field set of one index declaration.
pub fn index_fields(entry: &SchemaNode) -> Vec<SchemaNode> {
    match entry {
        SchemaNode::Sequence(items) => match items.first() {
            Some(SchemaNode::Mapping(first)) => key_nodes(first),
            _ => items.clone(),
        },
        SchemaNode::Mapping(mapping) => match mapping.get("fields") {
            Some(fields) if fields.is_truthy() => unwrap_fields(fields),
            _ => key_nodes(mapping),
        },
        SchemaNode::Scalar(_) => vec![entry.clone()],
    }
}

fn unwrap_fields(fields: &SchemaNode) -> Vec<SchemaNode> {
    match fields {
        SchemaNode::Mapping(mapping) => key_nodes(mapping),
        other => other.to_list(),
    }
}

fn key_nodes(mapping: &Mapping) -> Vec<SchemaNode> {
    mapping.keys().map(SchemaNode::string).collect()
}
