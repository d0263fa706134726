//! Forward conversion: declarative schema → storage table definition.
//!
//! The conversion walks the whole tree. At every mapping:
//!
//! - `properties` is renamed to `fields`
//! - `fields` is rebuilt by the properties step (storage types, `typeDef`,
//!   required rules)
//! - `indexes` is normalized into single-field index lists
//! - `key` is promoted to a list
//!
//! Values computed by these steps replace the raw value before recursion,
//! so they are never derived twice. Everything else is recursed as is.
//!
//! # Precondition
//!
//! A node describing a table must carry `properties` or `fields`. Other
//! shapes are converted structurally but do not yield a usable definition.

use schema_core::{Mapping, SchemaNode, TableDefinition, Validator};

use crate::index::normalize_indexes;
use crate::types::{is_collection, TypeMapper};

/// Converts declarative schemas into storage table definitions.
#[derive(Debug, Clone, Copy)]
pub struct SchemaConverter {
    types: TypeMapper,
}

impl Default for SchemaConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaConverter {
    pub fn new() -> Self {
        Self {
            types: TypeMapper::generic_to_storage(),
        }
    }

    /// Convert a table schema into a typed table definition.
    pub fn table_definition(&self, schema: &SchemaNode) -> TableDefinition {
        tracing::debug!("Converting schema to table definition");
        TableDefinition::from_node(self.convert(schema))
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

        source
            .iter()
            .map(|(key, raw)| {
                let property = output_key(key);
                let value = computed.get(property).unwrap_or(raw);
                (property, self.convert(value))
            })
            .collect()
    }

    /// Values that replace the raw ones of a mapping, keyed by output name.
    ///
    /// Contains `fields` when the mapping declares `properties` or `fields`,
    /// `indexes` when it declares indexes, and `key` when it declares a key.
    pub fn computed_entries(&self, source: &Mapping) -> Mapping {
        let mut computed = Mapping::new();

        if source.contains_key("properties") || source.contains_key("fields") {
            computed.insert("fields", self.properties(source));
        }
        if let Some(indexes) = source.get("indexes") {
            computed.insert("indexes", normalize_indexes(indexes));
        }
        if let Some(key) = source.get("key") {
            let key = match key {
                SchemaNode::Sequence(_) => key.clone(),
                other => SchemaNode::Sequence(vec![other.clone()]),
            };
            computed.insert("key", key);
        }

        computed
    }

    /// Properties step: storage-typed field descriptors with required rules.
    pub fn properties(&self, source: &Mapping) -> Mapping {
        let mut fields: Mapping = declared_fields(source)
            .map(|declared| {
                declared
                    .iter()
                    .map(|(name, descriptor)| (name, self.field(descriptor)))
                    .collect()
            })
            .unwrap_or_default();

        let required = source
            .get("required")
            .filter(|r| r.is_truthy())
            .map(SchemaNode::names)
            .unwrap_or_default();
        for name in required {
            match fields.get_mut(&name) {
                Some(descriptor) => require(descriptor),
                None => tracing::warn!(field = %name, "Required field is not declared, skipping"),
            }
        }

        fields
    }

    /// Copy one field descriptor with its type translated and, for
    /// collections, an element signature derived.
    pub fn field(&self, descriptor: &SchemaNode) -> SchemaNode {
        let Some(source) = descriptor.as_mapping() else {
            return descriptor.clone();
        };

        let mut field = source.clone();
        if let Some(declared) = source.get("type") {
            field.insert("type", self.types.translate_node(declared));
        }

        let storage_type = field.get("type").and_then(SchemaNode::as_str);
        if let Some(storage_type) = storage_type.filter(|t| is_collection(t)) {
            let explicit = field.get("typeDef").is_some_and(SchemaNode::is_truthy);
            if !explicit {
                if let Some(type_def) = self.type_def(storage_type, source) {
                    field.insert("typeDef", type_def);
                }
            }
        }

        SchemaNode::Mapping(field)
    }

    /// Element signature of a collection field, from the type of its first
    /// nested field: `<varchar,ELEMENT>` for maps, `<ELEMENT>` otherwise.
    pub fn type_def(&self, collection: &str, descriptor: &Mapping) -> Option<String> {
        let element = declared_fields(descriptor)?
            .first()
            .and_then(|(_, nested)| nested.get("type"))
            .and_then(SchemaNode::as_str)
            .map(|t| self.types.translate(t));

        match element {
            Some(element) if collection == "map" => Some(format!("<varchar,{element}>")),
            Some(element) => Some(format!("<{element}>")),
            None => {
                tracing::debug!(collection, "No element type to derive typeDef from");
                None
            }
        }
    }
}

fn output_key(key: &str) -> &str {
    match key {
        "properties" => "fields",
        other => other,
    }
}

// The storage side prefers `properties` over `fields`.
fn declared_fields(source: &Mapping) -> Option<&Mapping> {
    source
        .get("properties")
        .filter(|p| p.is_truthy())
        .or_else(|| source.get("fields"))
        .and_then(SchemaNode::as_mapping)
}

// Force `rule.required` and attach the presence validator unless the rule
// already has one.
fn require(descriptor: &mut SchemaNode) {
    let Some(field) = descriptor.as_mapping_mut() else {
        return;
    };

    match field.get_mut("rule").and_then(SchemaNode::as_mapping_mut) {
        Some(rule) => {
            rule.insert("required", true);
            if !rule.get("validator").is_some_and(SchemaNode::is_truthy) {
                rule.insert("validator", Validator::presence());
            }
        }
        None => {
            let mut rule = Mapping::new();
            rule.insert("required", true);
            rule.insert("validator", Validator::presence());
            field.insert("rule", rule);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema_core::Scalar;

    fn convert(yaml: &str) -> TableDefinition {
        SchemaConverter::new().table_definition(&SchemaNode::from_yaml(yaml).unwrap())
    }

    #[test]
    fn test_scalars_are_unchanged() {
        let converter = SchemaConverter::new();
        for scalar in [
            SchemaNode::from("varchar"),
            SchemaNode::from(42i64),
            SchemaNode::from(true),
            SchemaNode::null(),
        ] {
            assert_eq!(converter.convert(&scalar), scalar);
            assert_eq!(converter.convert(&converter.convert(&scalar)), scalar);
        }
    }

    #[test]
    fn test_type_def_from_json_value_uses_first_declared_field() {
        let schema = SchemaNode::from(serde_json::json!({
            "key": "id",
            "fields": {
                "id": {"type": "string"},
                "scores": {
                    "type": "object",
                    "fields": {"z": {"type": "integer"}, "a": {"type": "string"}}
                }
            }
        }));

        let table = SchemaConverter::new().table_definition(&schema);
        assert_eq!(table.type_def("scores"), Some("<varchar,int>"));
    }

    #[test]
    fn test_sequences_keep_order() {
        let converter = SchemaConverter::new();
        let node = SchemaNode::from_yaml("[c, a, b]").unwrap();
        assert_eq!(converter.convert(&node), node);
    }

    #[test]
    fn test_properties_renamed_to_fields() {
        let table = convert("{key: id, properties: {id: {type: string}}}");

        assert!(table.as_node().get("properties").is_none());
        assert_eq!(table.field_type("id"), Some("varchar"));
    }

    #[test]
    fn test_storage_types() {
        let table = convert(
            r#"
key: id
fields:
  id: { type: string }
  age: { type: integer }
  score: { type: number }
  active: { type: boolean }
  created: { type: timestamp }
"#,
        );

        assert_eq!(table.field_type("id"), Some("varchar"));
        assert_eq!(table.field_type("age"), Some("int"));
        assert_eq!(table.field_type("score"), Some("double"));
        assert_eq!(table.field_type("active"), Some("boolean"));
        // Unknown to the generic table: passes through
        assert_eq!(table.field_type("created"), Some("timestamp"));
    }

    #[test]
    fn test_collection_type_defs() {
        let table = convert(
            r#"
key: id
fields:
  id: { type: string }
  tags: { type: array, fields: { item: { type: string } } }
  counts: { type: object, fields: { v: { type: integer } } }
  flags: { type: set, properties: { f: { type: boolean } } }
"#,
        );

        assert_eq!(table.field_type("tags"), Some("list"));
        assert_eq!(table.type_def("tags"), Some("<varchar>"));
        assert_eq!(table.field_type("counts"), Some("map"));
        assert_eq!(table.type_def("counts"), Some("<varchar,int>"));
        assert_eq!(table.field_type("flags"), Some("set"));
        assert_eq!(table.type_def("flags"), Some("<boolean>"));
    }

    #[test]
    fn test_type_def_uses_first_nested_field() {
        let table = convert(
            r#"
key: id
fields:
  id: { type: string }
  scores: { type: object, fields: { z: { type: number }, a: { type: string } } }
"#,
        );
        assert_eq!(table.type_def("scores"), Some("<varchar,double>"));
    }

    #[test]
    fn test_explicit_type_def_is_kept() {
        let table = convert(
            r#"
key: id
fields:
  id: { type: string }
  tags: { type: list, typeDef: "<frozen<tuple<int,int>>>", fields: { item: { type: string } } }
"#,
        );
        assert_eq!(table.type_def("tags"), Some("<frozen<tuple<int,int>>>"));
    }

    #[test]
    fn test_collection_without_nested_fields_has_no_type_def() {
        let table = convert("{key: id, fields: {id: {type: string}, tags: {type: array}}}");

        assert_eq!(table.field_type("tags"), Some("list"));
        assert!(table.type_def("tags").is_none());
    }

    #[test]
    fn test_nested_fields_are_converted() {
        let table = convert(
            r#"
key: id
fields:
  id: { type: string }
  tags: { type: array, properties: { item: { type: string } } }
"#,
        );

        let tags = table.field("tags").unwrap();
        let nested = tags.get("fields").and_then(SchemaNode::as_mapping).unwrap();
        assert_eq!(
            nested.get("item").and_then(|i| i.get("type")).and_then(SchemaNode::as_str),
            Some("varchar")
        );
    }

    #[test]
    fn test_key_promoted_to_list() {
        assert_eq!(convert("{key: id, fields: {id: {type: string}}}").key(), vec!["id"]);
        assert_eq!(
            convert("{key: [a, b], fields: {a: {type: string}, b: {type: string}}}").key(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_indexes_normalized() {
        let table = convert(
            r#"
key: id
fields:
  id: { type: string }
  email: { type: string }
  name: { type: string }
indexes:
  - [email]
  - { fields: [name] }
  - [email, name]
  - {}
"#,
        );
        assert_eq!(
            table.indexes(),
            vec![vec!["email".to_string()], vec!["name".to_string()]]
        );
    }

    #[test]
    fn test_required_attaches_rule_and_presence_validator() {
        let table = convert(
            r#"
key: id
required: [email]
fields:
  id: { type: string }
  email: { type: string }
"#,
        );

        let rule = table.field("email").and_then(|f| f.get("rule")).unwrap();
        assert_eq!(rule.get("required"), Some(&SchemaNode::from(true)));
        match rule.get("validator").and_then(SchemaNode::as_scalar) {
            Some(Scalar::Validator(v)) => {
                assert_eq!(v.name(), Validator::PRESENCE);
                assert!(v.check(&serde_json::json!("a@b.c")));
                assert!(!v.check(&serde_json::json!("")));
            }
            other => panic!("expected presence validator, got {other:?}"),
        }
        assert!(table.field("id").and_then(|f| f.get("rule")).is_none());
    }

    #[test]
    fn test_required_keeps_existing_validator() {
        let mut email = Mapping::new();
        email.insert("type", "string");
        let mut rule = Mapping::new();
        rule.insert("required", false);
        rule.insert("validator", Validator::new("email", |v| v.is_string()));
        email.insert("rule", rule);

        let mut fields = Mapping::new();
        fields.insert("email", email);
        let mut schema = Mapping::new();
        schema.insert("key", "email");
        schema.insert("required", SchemaNode::Sequence(vec!["email".into()]));
        schema.insert("fields", fields);

        let table = SchemaConverter::new().table_definition(&SchemaNode::Mapping(schema));
        let rule = table.field("email").and_then(|f| f.get("rule")).unwrap();

        assert_eq!(rule.get("required"), Some(&SchemaNode::from(true)));
        assert_eq!(
            rule.get("validator"),
            Some(&SchemaNode::from(Validator::new("email", |_| true)))
        );
    }

    #[test]
    fn test_undeclared_required_name_is_skipped() {
        let table = convert("{key: id, required: [ghost], fields: {id: {type: string}}}");
        assert!(table.field("ghost").is_none());
        assert_eq!(table.fields().map(Mapping::len), Some(1));
    }

    #[test]
    fn test_options_and_extra_keys_pass_through() {
        let table = convert(
            r#"
key: id
ttl: 86400
fields:
  id: { type: string }
options:
  timestamps: false
  clustering_order: { created: desc }
"#,
        );

        assert_eq!(
            table.options().and_then(|o| o.get("timestamps")),
            Some(&SchemaNode::from(false))
        );
        assert_eq!(table.as_node().get("ttl"), Some(&SchemaNode::from(86400i64)));
    }

    #[test]
    fn test_computed_entries() {
        let converter = SchemaConverter::new();
        let source =
            SchemaNode::from_yaml("{key: id, fields: {id: {type: string}}, indexes: [[id, x]]}")
                .unwrap();
        let computed = converter.computed_entries(source.as_mapping().unwrap());

        let keys: Vec<&str> = computed.keys().collect();
        assert_eq!(keys, vec!["fields", "indexes", "key"]);
        assert_eq!(computed.get("indexes"), Some(&SchemaNode::Sequence(vec![])));
        assert_eq!(computed.get("key"), Some(&SchemaNode::Sequence(vec!["id".into()])));
    }

    #[test]
    fn test_source_is_not_mutated() {
        let source = SchemaNode::from_yaml(
            r#"
key: id
required: [id]
properties:
  id: { type: string }
  t: { type: array, fields: { i: { type: integer } } }
"#,
        )
        .unwrap();
        let snapshot = source.clone();

        let converter = SchemaConverter::new();
        let first = converter.table_definition(&source);
        let second = converter.table_definition(&source);

        assert_eq!(source, snapshot);
        assert_eq!(first, second);
    }
}
