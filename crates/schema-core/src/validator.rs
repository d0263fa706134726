//! Field validator predicates.
//!
//! A [`Validator`] is the value stored under a field's `rule.validator`.
//! Validators cannot be written in a YAML or JSON schema file; they are
//! attached by the schema converter (the presence validator) or by callers
//! building schemas in code.

use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

type Check = dyn Fn(&Value) -> bool + Send + Sync;

/// A named predicate over a record value.
///
/// Two validators compare equal when their names are equal; the predicate
/// itself is opaque.
#[derive(Clone)]
pub struct Validator {
    name: Cow<'static, str>,
    check: Arc<Check>,
}

impl Validator {
    /// Name of the default presence validator.
    pub const PRESENCE: &'static str = "presence";

    /// Create a validator from a name and a predicate.
    pub fn new<F>(name: impl Into<Cow<'static, str>>, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// The validator attached to required fields: accepts truthy values only.
    pub fn presence() -> Self {
        Self::new(Self::PRESENCE, is_truthy_json)
    }

    /// Validator name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the predicate against a value.
    pub fn check(&self, value: &Value) -> bool {
        (self.check)(value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Validator").field(&self.name).finish()
    }
}

impl PartialEq for Validator {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Truthiness of a JSON value.
///
/// `null`, `false`, zero, NaN and the empty string are falsy. Arrays and
/// objects are truthy even when empty.
pub fn is_truthy_json(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
