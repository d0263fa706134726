//! Reverse conversion: declarative schema → structural validation schema.
//!
//! Mirror image of [`crate::forward`]: `fields` is renamed to `properties`,
//! property types are translated storage → generic, and every mapping that
//! declares fields also gets a merged `required` list. No `typeDef` is
//! derived; the validation schema is shaped by types only.

use schema_core::{Mapping, SchemaNode, ValidationSchema};

use crate::required::resolve_required;
use crate::types::TypeMapper;

/// Converts declarative schemas into validation schemas.
#[derive(Debug, Clone, Copy)]
pub struct ValidatorConverter {
    types: TypeMapper,
}

impl Default for ValidatorConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidatorConverter {
    pub fn new() -> Self {
        Self {
            types: TypeMapper::storage_to_generic(),
        }
    }

    /// Convert a table schema into a typed validation schema.
    pub fn validation_schema(&self, schema: &SchemaNode) -> ValidationSchema {
        tracing::debug!("Converting schema to validation schema");
        ValidationSchema::from_node(self.convert(schema))
    }

    /// Convert any schema node. Scalars are returned unchanged.
    pub fn convert(&self, node: &SchemaNode) -> SchemaNode {
        match node {
            SchemaNode::Sequence(items) => {
                SchemaNode::Sequence(items.iter().map(|item| self.convert(item)).collect())
            }
            SchemaNode::Mapping(source) => SchemaNode::Mapping(self.convert_mapping(source)),
            SchemaNode::Scalar(_) => node.clone(),
        }
    }

    fn convert_mapping(&self, source: &Mapping) -> Mapping {
        let computed = self.computed_entries(source);
        let mut result = Mapping::new();

        for (key, raw) in source.iter() {
            let property = output_key(key);
            let value = computed.get(property).unwrap_or(raw);
            result.insert(property, self.convert(value));

            // `required` sits next to `properties` unless the source placed it earlier
            if property == "properties" && !result.contains_key("required") {
                if let Some(required) = computed.get("required") {
                    result.insert("required", self.convert(required));
                }
            }
        }

        result
    }

    /// Values that replace the raw ones of a mapping, keyed by output name.
    ///
    /// When the mapping declares `fields` or `properties`, contains the
    /// converted `properties` and the merged `required` list.
    pub fn computed_entries(&self, source: &Mapping) -> Mapping {
        let mut computed = Mapping::new();

        if source.contains_key("fields") || source.contains_key("properties") {
            let declared = declared_fields(source).cloned().unwrap_or_default();
            computed.insert("properties", self.properties(&declared));
            computed.insert(
                "required",
                SchemaNode::Sequence(resolve_required(source, &declared)),
            );
        }

        computed
    }

    /// Properties step: copy each descriptor with its type translated.
    pub fn properties(&self, declared: &Mapping) -> Mapping {
        declared
            .iter()
            .map(|(name, descriptor)| (name, self.property(descriptor)))
            .collect()
    }

    fn property(&self, descriptor: &SchemaNode) -> SchemaNode {
        let Some(source) = descriptor.as_mapping() else {
            return descriptor.clone();
        };

        let mut property = source.clone();
        if let Some(declared) = source.get("type") {
            property.insert("type", self.types.translate_node(declared));
        }
        SchemaNode::Mapping(property)
    }
}

fn output_key(key: &str) -> &str {
    match key {
        "fields" => "properties",
        other => other,
    }
}

// The validation side prefers `fields` over `properties`.
fn declared_fields(source: &Mapping) -> Option<&Mapping> {
    source
        .get("fields")
        .filter(|f| f.is_truthy())
        .or_else(|| source.get("properties"))
        .and_then(SchemaNode::as_mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    const WITH_TAGS: &str =
        "{key: id, fields: {id: {type: string}, tags: {type: list, fields: {i: {type: varchar}}}}}";

    fn convert(yaml: &str) -> ValidationSchema {
        ValidatorConverter::new().validation_schema(&SchemaNode::from_yaml(yaml).unwrap())
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_scalars_are_unchanged() {
        let converter = ValidatorConverter::new();
        for scalar in [SchemaNode::from("varchar"), SchemaNode::from(7i64), SchemaNode::null()] {
            assert_eq!(converter.convert(&scalar), scalar);
        }
    }

    #[test]
    fn test_fields_renamed_to_properties() {
        let schema = convert("{key: id, fields: {id: {type: varchar}}}");

        assert!(schema.as_node().get("fields").is_none());
        assert_eq!(schema.property_type("id"), Some("string"));
    }

    #[test]
    fn test_generic_types() {
        let schema = convert(
            r#"
key: id
fields:
  id: { type: uuid }
  amount: { type: decimal }
  hits: { type: counter }
  tags: { type: set }
  attrs: { type: map }
  name: { type: string }
"#,
        );

        assert_eq!(schema.property_type("id"), Some("string"));
        assert_eq!(schema.property_type("amount"), Some("number"));
        assert_eq!(schema.property_type("hits"), Some("number"));
        assert_eq!(schema.property_type("tags"), Some("array"));
        assert_eq!(schema.property_type("attrs"), Some("object"));
        // Already generic: passes through
        assert_eq!(schema.property_type("name"), Some("string"));
    }

    #[test]
    fn test_no_type_def_is_derived() {
        let schema = convert(WITH_TAGS);
        assert!(schema.property("tags").unwrap().get("typeDef").is_none());
    }

    #[test]
    fn test_required_set_merge() {
        let schema = convert(
            r#"
key: id
required: [email]
fields:
  id: { type: string }
  email: { type: string }
  age: { type: integer, rule: { required: true } }
"#,
        );
        assert_eq!(schema.required(), set(&["id", "email", "age"]));
    }

    #[test]
    fn test_required_contains_key() {
        let schema =
            convert("{key: [tenant, id], fields: {tenant: {type: string}, id: {type: string}}}");
        let required = schema.required();
        for key in schema.key() {
            assert!(required.contains(&key));
        }
        assert_eq!(required, set(&["tenant", "id"]));
    }

    #[test]
    fn test_computed_required_wins_regardless_of_position() {
        let fields = "fields: {id: {type: string}, email: {type: string}}";
        let before = convert(&format!("{{required: [email], key: id, {fields}}}"));
        let after = convert(&format!("{{key: id, {fields}, required: [email]}}"));

        assert_eq!(before.required(), set(&["id", "email"]));
        assert_eq!(after.required(), set(&["id", "email"]));

        let keys: Vec<&str> = after.as_node().as_mapping().unwrap().keys().collect();
        assert_eq!(keys, vec!["key", "properties", "required"]);
    }

    #[test]
    fn test_fields_preferred_over_properties() {
        let schema = convert(
            r#"
key: id
properties: { name: { type: text } }
fields: { id: { type: varchar } }
"#,
        );
        let properties = schema.properties().unwrap();
        assert!(properties.contains_key("id"));
        assert!(!properties.contains_key("name"));
    }

    #[test]
    fn test_key_is_passed_through() {
        let schema = convert("{key: id, fields: {id: {type: string}}}");
        assert_eq!(schema.as_node().get("key"), Some(&SchemaNode::from("id")));
        assert_eq!(schema.key(), vec!["id"]);
    }

    #[test]
    fn test_nested_fields_get_required() {
        let schema = convert(WITH_TAGS);
        let tags = schema.property("tags").unwrap();

        assert_eq!(
            tags.get("properties")
                .and_then(|p| p.get("i"))
                .and_then(|i| i.get("type"))
                .and_then(SchemaNode::as_str),
            Some("string")
        );
        assert_eq!(tags.get("required"), Some(&SchemaNode::Sequence(vec![])));
    }

    #[test]
    fn test_ttl_passes_through() {
        let schema = convert("{key: id, ttl: 30, fields: {id: {type: string}}}");
        assert_eq!(schema.ttl(), 30);
    }
}
