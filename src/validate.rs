//! Record validation against a validation schema.
//!
//! [`RecordValidator`] is the boundary the adapter calls before writes.
//! [`StructuralValidator`] is the built-in implementation: it walks the
//! record along the schema's `properties` and never mutates it.

use schema_core::{Scalar, SchemaNode, ValidationSchema};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// One validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Field path (`$root` for the record itself)
    pub field: String,
    /// Expected type or condition
    pub expected: String,
    /// Actual value or type found
    pub actual: String,
}

impl Violation {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::new(field, "field to be present", "missing")
    }

    pub fn type_mismatch(field: impl Into<String>, expected: &str, value: &Value) -> Self {
        Self::new(field, expected, json_type_name(value))
    }

    pub fn rejected(field: impl Into<String>, validator: &str) -> Self {
        Self::new(field, format!("value accepted by '{validator}'"), "rejected")
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, found {}",
            self.field, self.expected, self.actual
        )
    }
}

/// Validates records against a validation schema.
pub trait RecordValidator: Send + Sync {
    /// Return every violation; an empty list means the record is valid.
    fn validate(&self, record: &Value, schema: &ValidationSchema) -> Vec<Violation>;
}

/// Structural validation.
///
/// Reports required properties that are absent or null, present
/// properties whose JSON type does not match the generic `type`, and
/// values rejected by a property's `rule.validator`. Object values whose
/// descriptor declares nested `properties` or `required` are checked the
/// same way, with violations named by their dotted path. Types outside
/// the generic vocabulary are not checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl RecordValidator for StructuralValidator {
    fn validate(&self, record: &Value, schema: &ValidationSchema) -> Vec<Violation> {
        let Some(object) = record.as_object() else {
            return vec![Violation::type_mismatch("$root", "object", record)];
        };

        let mut violations = Vec::new();
        check_object(None, object, schema.as_node(), &mut violations);
        violations
    }
}

fn check_object(
    path: Option<&str>,
    object: &Map<String, Value>,
    schema: &SchemaNode,
    violations: &mut Vec<Violation>,
) {
    let field_path = |name: &str| match path {
        Some(parent) => format!("{parent}.{name}"),
        None => name.to_string(),
    };

    let required: BTreeSet<String> = schema
        .get("required")
        .and_then(SchemaNode::as_sequence)
        .map(|names| names.iter().flat_map(SchemaNode::names).collect())
        .unwrap_or_default();
    violations.extend(
        required
            .iter()
            .filter(|name| object.get(name.as_str()).map_or(true, Value::is_null))
            .map(|name| Violation::missing_field(field_path(name))),
    );

    let Some(properties) = schema.get("properties").and_then(SchemaNode::as_mapping) else {
        return;
    };

    for (name, descriptor) in properties.iter() {
        let Some(value) = object.get(name).filter(|v| !v.is_null()) else {
            continue;
        };
        let path = field_path(name);

        if let Some(expected) = descriptor.get("type").and_then(SchemaNode::as_str) {
            if !matches_type(expected, value) {
                violations.push(Violation::type_mismatch(path, expected, value));
                continue;
            }
        }

        let validator = descriptor
            .get("rule")
            .and_then(|rule| rule.get("validator"))
            .and_then(SchemaNode::as_scalar);
        if let Some(Scalar::Validator(validator)) = validator {
            if !validator.check(value) {
                violations.push(Violation::rejected(path.clone(), validator.name()));
            }
        }

        let nested = descriptor.get("properties").is_some() || descriptor.get("required").is_some();
        if nested {
            if let Some(inner) = value.as_object() {
                check_object(Some(&path), inner, descriptor, violations);
            }
        }
    }
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "integer"
            } else {
                "number"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cql_types::ValidatorConverter;
    use schema_core::{Mapping, Validator};
    use serde_json::json;

    fn users() -> ValidationSchema {
        ValidatorConverter::new().validation_schema(
            &SchemaNode::from_yaml(
                r#"
key: id
required: [email]
fields:
  id: { type: varchar }
  email: { type: text }
  age: { type: int }
  tags: { type: set }
  active: { type: boolean }
  seen: { type: timestamp }
"#,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_valid_record() {
        let record = json!({
            "id": "u1",
            "email": "a@example.com",
            "age": 30,
            "tags": ["x"],
            "active": true
        });
        assert!(StructuralValidator.validate(&record, &users()).is_empty());
    }

    #[test]
    fn test_missing_required_fields() {
        let record = json!({"email": null, "age": 3});
        let violations = StructuralValidator.validate(&record, &users());

        assert_eq!(
            violations,
            vec![
                Violation::missing_field("email"),
                Violation::missing_field("id"),
            ]
        );
    }

    #[test]
    fn test_type_mismatch() {
        let record = json!({"id": "u1", "email": "a@example.com", "age": "thirty", "tags": "x"});
        let violations = StructuralValidator.validate(&record, &users());

        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].field, "age");
        assert_eq!(violations[0].expected, "number");
        assert_eq!(violations[0].actual, "string");
        assert_eq!(violations[1].field, "tags");
        assert_eq!(violations[1].to_string(), "tags: expected array, found string");
    }

    #[test]
    fn test_nested_object_fields() {
        let schema = ValidatorConverter::new().validation_schema(
            &SchemaNode::from_yaml(
                r#"
key: id
fields:
  id: { type: varchar }
  attrs:
    type: map
    fields:
      v: { type: int, rule: { required: true } }
"#,
            )
            .unwrap(),
        );

        assert!(StructuralValidator
            .validate(&json!({"id": "1", "attrs": {"v": 7}}), &schema)
            .is_empty());
        assert_eq!(
            StructuralValidator.validate(&json!({"id": "1", "attrs": {}}), &schema),
            vec![Violation::missing_field("attrs.v")]
        );
        assert_eq!(
            StructuralValidator.validate(&json!({"id": "1", "attrs": {"v": "seven"}}), &schema),
            vec![Violation::new("attrs.v", "number", "string")]
        );
    }

    #[test]
    fn test_nested_properties_ignored_for_arrays() {
        let schema = ValidatorConverter::new().validation_schema(
            &SchemaNode::from_yaml(
                r#"
key: id
fields:
  id: { type: varchar }
  tags:
    type: list
    fields:
      item: { type: varchar, rule: { required: true } }
"#,
            )
            .unwrap(),
        );

        let record = json!({"id": "u1", "tags": ["x", "y"]});
        assert!(StructuralValidator.validate(&record, &schema).is_empty());
    }

    #[test]
    fn test_record_must_be_object() {
        let violations = StructuralValidator.validate(&json!([1, 2]), &users());
        assert_eq!(violations, vec![Violation::new("$root", "object", "array")]);
    }

    #[test]
    fn test_custom_validator_runs() {
        let mut rule = Mapping::new();
        rule.insert("validator", Validator::new("adult", |v| v.as_i64().is_some_and(|a| a >= 18)));
        let mut age = Mapping::new();
        age.insert("type", "integer");
        age.insert("rule", rule);
        let mut fields = Mapping::new();
        fields.insert("age", age);
        let mut schema = Mapping::new();
        schema.insert("fields", fields);

        let schema = ValidatorConverter::new().validation_schema(&SchemaNode::Mapping(schema));

        assert!(StructuralValidator.validate(&json!({"age": 21}), &schema).is_empty());
        assert_eq!(
            StructuralValidator.validate(&json!({"age": 12}), &schema),
            vec![Violation::rejected("age", "adult")]
        );
    }
}
