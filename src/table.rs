//! Per-table handle.
//!
//! A [`Table`] is created for every table the adapter has synced. It keeps
//! both converted artifacts and prepares records for writes; issuing the
//! reads and writes is left to the storage driver.

use chrono::{DateTime, SecondsFormat, Utc};
use schema_core::{TableDefinition, ValidationSchema};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::timestamps::Timestamps;
use crate::validate::{RecordValidator, StructuralValidator, Violation};

/// A synced table.
#[derive(Clone)]
pub struct Table {
    name: String,
    definition: TableDefinition,
    validation: ValidationSchema,
    key: Vec<String>,
    fields: Vec<String>,
    ttl: u64,
    timestamps: Timestamps,
    validator: Arc<dyn RecordValidator>,
}

impl Table {
    pub fn new(
        name: impl Into<String>,
        definition: TableDefinition,
        validation: ValidationSchema,
        timestamps: Timestamps,
    ) -> Self {
        let key = validation.key();
        let fields = validation
            .properties()
            .map(|p| p.keys().map(str::to_string).collect())
            .unwrap_or_default();
        let ttl = validation.ttl();

        Self {
            name: name.into(),
            definition,
            validation,
            key,
            fields,
            ttl,
            timestamps,
            validator: Arc::new(StructuralValidator),
        }
    }

    /// Replace the record validator.
    pub fn with_validator(mut self, validator: Arc<dyn RecordValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &TableDefinition {
        &self.definition
    }

    pub fn validation(&self) -> &ValidationSchema {
        &self.validation
    }

    /// Key field names.
    pub fn key(&self) -> &[String] {
        &self.key
    }

    /// Declared property names.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Default time-to-live in seconds, `0` for none.
    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    pub fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }

    /// Validate a record. Returns the record's violations on failure.
    pub fn validate(&self, record: &Value) -> Result<(), Vec<Violation>> {
        let violations = self.validator.validate(record, &self.validation);
        if violations.is_empty() {
            Ok(())
        } else {
            tracing::debug!(
                table = %self.name,
                count = violations.len(),
                "Record failed validation"
            );
            Err(violations)
        }
    }

    /// Key conditions identifying a record. Missing key values are `null`.
    pub fn key_of(&self, record: &Value) -> Map<String, Value> {
        self.key
            .iter()
            .map(|k| (k.clone(), record.get(k).cloned().unwrap_or(Value::Null)))
            .collect()
    }

    /// Declared properties present in a record; everything else is dropped.
    pub fn project(&self, record: &Value) -> Map<String, Value> {
        self.fields
            .iter()
            .filter_map(|f| record.get(f).map(|v| (f.clone(), v.clone())))
            .collect()
    }

    /// Stamp timestamp columns for a write: `created_at` keeps an existing
    /// value or gets `now`, `updated_at` always gets `now`.
    pub fn stamp(
        &self,
        values: &mut Map<String, Value>,
        existing: Option<&Value>,
        now: DateTime<Utc>,
    ) {
        let now = Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true));

        if let Some(created_at) = &self.timestamps.created_at {
            let created = existing
                .and_then(|e| e.get(created_at))
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(|| now.clone());
            values.insert(created_at.clone(), created);
        }
        if let Some(updated_at) = &self.timestamps.updated_at {
            values.insert(updated_at.clone(), now);
        }
    }

    /// TTL for a write: the requested one, else the table default.
    pub fn write_ttl(&self, requested: Option<u64>) -> Option<u64> {
        requested
            .filter(|ttl| *ttl > 0)
            .or((self.ttl > 0).then_some(self.ttl))
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("fields", &self.fields)
            .field("ttl", &self.ttl)
            .field("timestamps", &self.timestamps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use cql_types::{SchemaConverter, ValidatorConverter};
    use schema_core::SchemaNode;
    use serde_json::json;

    fn users() -> Table {
        let schema = SchemaNode::from_yaml(
            r#"
key: [tenant, id]
ttl: 3600
required: [email]
properties:
  tenant: { type: string }
  id: { type: string }
  email: { type: string }
  age: { type: integer }
"#,
        )
        .unwrap();

        Table::new(
            "users",
            SchemaConverter::new().table_definition(&schema),
            ValidatorConverter::new().validation_schema(&schema),
            Timestamps::default(),
        )
    }

    #[test]
    fn test_table_metadata() {
        let table = users();

        assert_eq!(table.name(), "users");
        assert_eq!(table.key(), ["tenant", "id"]);
        assert_eq!(table.fields(), ["tenant", "id", "email", "age"]);
        assert_eq!(table.ttl(), 3600);
    }

    #[test]
    fn test_validate() {
        let table = users();

        assert!(table
            .validate(&json!({"tenant": "t", "id": "1", "email": "a@b.c"}))
            .is_ok());

        let violations = table.validate(&json!({"tenant": "t", "id": "1"})).unwrap_err();
        assert_eq!(violations, vec![Violation::missing_field("email")]);
    }

    #[test]
    fn test_key_of_and_project() {
        let table = users();
        let record = json!({"id": "1", "email": "a@b.c", "unknown": true});

        assert_eq!(
            Value::Object(table.key_of(&record)),
            json!({"tenant": null, "id": "1"})
        );
        assert_eq!(
            Value::Object(table.project(&record)),
            json!({"id": "1", "email": "a@b.c"})
        );
    }

    #[test]
    fn test_stamp_new_and_existing() {
        let table = users();
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let mut values = Map::new();
        table.stamp(&mut values, None, now);
        assert_eq!(values["created_at"], json!("2024-01-02T03:04:05.000Z"));
        assert_eq!(values["updated_at"], json!("2024-01-02T03:04:05.000Z"));

        let existing = json!({"created_at": "2023-12-31T00:00:00.000Z"});
        let mut values = Map::new();
        table.stamp(&mut values, Some(&existing), now);
        assert_eq!(values["created_at"], json!("2023-12-31T00:00:00.000Z"));
        assert_eq!(values["updated_at"], json!("2024-01-02T03:04:05.000Z"));
    }

    #[test]
    fn test_stamp_disabled() {
        let table = Table::new(
            "events",
            TableDefinition::from_node(SchemaNode::null()),
            ValidationSchema::from_node(SchemaNode::null()),
            Timestamps::disabled(),
        );
        let mut values = Map::new();
        table.stamp(&mut values, None, Utc::now());
        assert!(values.is_empty());
    }

    #[test]
    fn test_write_ttl() {
        let table = users();
        assert_eq!(table.write_ttl(None), Some(3600));
        assert_eq!(table.write_ttl(Some(60)), Some(60));
        assert_eq!(table.write_ttl(Some(0)), Some(3600));
    }
}
