//! Required field set resolution.
//!
//! The required set of a validation schema merges three sources, in this
//! order: the table key, the explicit `required` list, and every field
//! whose `rule.required` is `true`. Duplicates are removed; the first
//! occurrence wins. Callers must treat the result as a set.

use schema_core::{Mapping, Scalar, SchemaNode};

/// Resolve the required names of a table schema.
///
/// `declared` is the table's field mapping (`fields` or `properties`).
pub fn resolve_required(source: &Mapping, declared: &Mapping) -> Vec<SchemaNode> {
    let keys = listed(source.get("key"));
    let explicit = listed(source.get("required"));
    let ruled = declared
        .iter()
        .filter(|(_, descriptor)| is_rule_required(descriptor))
        .map(|(name, _)| SchemaNode::string(name));

    let mut required: Vec<SchemaNode> = Vec::new();
    for name in keys.into_iter().chain(explicit).chain(ruled) {
        if !required.contains(&name) {
            required.push(name);
        }
    }
    required
}

/// Whether a field descriptor carries `rule.required: true`.
pub fn is_rule_required(descriptor: &SchemaNode) -> bool {
    matches!(
        descriptor
            .get("rule")
            .and_then(|rule| rule.get("required"))
            .and_then(SchemaNode::as_scalar),
        Some(Scalar::Bool(true))
    )
}

// Absent or falsy values contribute nothing; scalars count as one name.
fn listed(node: Option<&SchemaNode>) -> Vec<SchemaNode> {
    match node {
        Some(node) if node.is_truthy() => node.to_list(),
        _ => Vec::new(),
    }
}
