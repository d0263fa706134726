//! Schema node tree.
//!
//! A declarative table schema is parsed once into a [`SchemaNode`], an
//! explicit tagged union of scalars, sequences and mappings. Converters
//! match on the tag instead of probing the shape of untyped values at every
//! recursive step.
//!
//! # YAML Format
//!
//! ```yaml
//! key: id
//! required: [email]
//! properties:
//!   id: { type: string }
//!   email: { type: string }
//!   tags:
//!     type: array
//!     fields:
//!       item: { type: string }
//! indexes:
//!   - [email]
//! ```

use indexmap::IndexMap;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::schema::SchemaError;
use crate::validator::Validator;

/// Leaf value of a schema tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Predicate attached under `rule.validator`
    Validator(Validator),
}

impl Scalar {
    /// Borrow the string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness: `null`, `false`, zero, NaN and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0 && !f.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Validator(_) => true,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Validator(v) => write!(f, "{}", v.name()),
        }
    }
}

/// A node of a declarative schema tree.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Scalar(Scalar),
    Sequence(Vec<SchemaNode>),
    Mapping(Mapping),
}

impl SchemaNode {
    /// The `null` scalar.
    pub fn null() -> Self {
        Self::Scalar(Scalar::Null)
    }

    /// A string scalar.
    pub fn string(s: impl Into<String>) -> Self {
        Self::Scalar(Scalar::String(s.into()))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[SchemaNode]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Borrow the string value of a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    /// Look up a key when this node is a mapping.
    pub fn get(&self, key: &str) -> Option<&SchemaNode> {
        self.as_mapping().and_then(|m| m.get(key))
    }

    /// Truthiness. Sequences and mappings are always truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Scalar(s) => s.is_truthy(),
            Self::Sequence(_) | Self::Mapping(_) => true,
        }
    }

    /// Promote to a list: a sequence yields its items, anything else
    /// becomes a one-element list.
    pub fn to_list(&self) -> Vec<SchemaNode> {
        match self {
            Self::Sequence(items) => items.clone(),
            other => vec![other.clone()],
        }
    }

    /// Flatten into names: scalars render as text, sequences flatten
    /// recursively and mappings contribute their keys.
    pub fn names(&self) -> Vec<String> {
        match self {
            Self::Scalar(s) => vec![s.to_string()],
            Self::Sequence(items) => items.iter().flat_map(SchemaNode::names).collect(),
            Self::Mapping(m) => m.keys().map(str::to_string).collect(),
        }
    }

    /// Render as a JSON value. Validators render as their name and
    /// non-finite floats as `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            Self::Scalar(Scalar::Null) => Value::Null,
            Self::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
            Self::Scalar(Scalar::Int(i)) => Value::from(*i),
            Self::Scalar(Scalar::Float(f)) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Scalar(Scalar::String(s)) => Value::String(s.clone()),
            Self::Scalar(Scalar::Validator(v)) => Value::String(v.name().to_string()),
            Self::Sequence(items) => Value::Array(items.iter().map(SchemaNode::to_json).collect()),
            Self::Mapping(m) => Value::Object(
                m.iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Parse a schema tree from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a schema tree from JSON.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a schema tree from a file. `.json` files are parsed as JSON,
    /// everything else as YAML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }
}

impl From<Scalar> for SchemaNode {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl From<&str> for SchemaNode {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<String> for SchemaNode {
    fn from(s: String) -> Self {
        Self::string(s)
    }
}

impl From<bool> for SchemaNode {
    fn from(b: bool) -> Self {
        Self::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for SchemaNode {
    fn from(i: i64) -> Self {
        Self::Scalar(Scalar::Int(i))
    }
}

impl From<f64> for SchemaNode {
    fn from(f: f64) -> Self {
        Self::Scalar(Scalar::Float(f))
    }
}

impl From<Validator> for SchemaNode {
    fn from(v: Validator) -> Self {
        Self::Scalar(Scalar::Validator(v))
    }
}

impl From<Vec<SchemaNode>> for SchemaNode {
    fn from(items: Vec<SchemaNode>) -> Self {
        Self::Sequence(items)
    }
}

impl From<Mapping> for SchemaNode {
    fn from(m: Mapping) -> Self {
        Self::Mapping(m)
    }
}

impl From<serde_json::Value> for SchemaNode {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::null(),
            Value::Bool(b) => b.into(),
            Value::Number(n) => match n.as_i64() {
                Some(i) => i.into(),
                None => n.as_f64().unwrap_or(f64::NAN).into(),
            },
            Value::String(s) => s.into(),
            Value::Array(items) => Self::Sequence(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::Mapping(map.into_iter().collect()),
        }
    }
}

/// Ordered mapping with unique keys.
///
/// Iteration follows insertion order. Inserting a key that is already
/// present replaces its value in place. Equality ignores order.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    entries: IndexMap<String, SchemaNode>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&SchemaNode> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut SchemaNode> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert a value, returning the previous one if the key existed.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<SchemaNode>,
    ) -> Option<SchemaNode> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove a key, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<SchemaNode> {
        self.entries.shift_remove(key)
    }

    /// First entry in insertion order.
    pub fn first(&self) -> Option<(&str, &SchemaNode)> {
        self.entries.first().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &SchemaNode> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| o == v))
    }
}

impl<K, V> FromIterator<(K, V)> for Mapping
where
    K: Into<String>,
    V: Into<SchemaNode>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (k, v) in iter {
            mapping.insert(k, v);
        }
        mapping
    }
}

impl IntoIterator for Mapping {
    type Item = (String, SchemaNode);
    type IntoIter = indexmap::map::IntoIter<String, SchemaNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// Custom serialization/deserialization for SchemaNode
// The node kind is inferred from the input shape once, here, at parse time.

impl Serialize for SchemaNode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Scalar(Scalar::Null) => serializer.serialize_unit(),
            Self::Scalar(Scalar::Bool(b)) => serializer.serialize_bool(*b),
            Self::Scalar(Scalar::Int(i)) => serializer.serialize_i64(*i),
            Self::Scalar(Scalar::Float(f)) => serializer.serialize_f64(*f),
            Self::Scalar(Scalar::String(s)) => serializer.serialize_str(s),
            Self::Scalar(Scalar::Validator(v)) => serializer.serialize_str(v.name()),
            Self::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Mapping(m) => m.serialize(serializer),
        }
    }
}

impl Serialize for Mapping {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SchemaNode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(SchemaNodeVisitor)
    }
}

impl<'de> Deserialize<'de> for Mapping {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match SchemaNode::deserialize(deserializer)? {
            SchemaNode::Mapping(m) => Ok(m),
            _ => Err(de::Error::custom("expected a mapping")),
        }
    }
}

struct SchemaNodeVisitor;

impl<'de> Visitor<'de> for SchemaNodeVisitor {
    type Value = SchemaNode;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a scalar, a sequence or a mapping")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(v.into())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(v.into())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(match i64::try_from(v) {
            Ok(i) => i.into(),
            Err(_) => (v as f64).into(),
        })
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(v.into())
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(v.into())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(v.into())
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(SchemaNode::null())
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(SchemaNode::null())
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        SchemaNode::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(SchemaNode::Sequence(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut mapping = Mapping::new();
        while let Some(key) = map.next_key::<SchemaNode>()? {
            // YAML allows non-string keys such as `1: ...`
            let key = match key {
                SchemaNode::Scalar(s) => s.to_string(),
                _ => return Err(de::Error::custom("mapping keys must be scalars")),
            };
            let value: SchemaNode = map.next_value()?;
            mapping.insert(key, value);
        }
        Ok(SchemaNode::Mapping(mapping))
    }
}
