//! Dynamic-layout constructor values
//!
//! A [`Record`] is an ordered field map whose shape is only known at runtime,
//! e.g. a constructor loaded from a JSON configuration file. When a record is
//! instantiated each entry is copied like a declared field would be.
//! Integers keep full precision: values beyond `i64` load as
//! [`FieldValue::UInt`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::constructor::Constructor;
use crate::copy::{CopyMemo, CopyMode, Duplicate};
use crate::shared::Shared;

/// A field value inside a [`Record`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Missing value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Unsigned integer too large for `Int`
    UInt(u64),
    /// Float
    Float(f64),
    /// String
    Str(String),
    /// Shared list
    List(Shared<Vec<FieldValue>>),
    /// Shared nested map
    Map(Shared<IndexMap<String, FieldValue>>),
}

impl FieldValue {
    /// Build a list value
    #[must_use]
    pub fn list(items: impl IntoIterator<Item = FieldValue>) -> Self {
        Self::List(Shared::new(items.into_iter().collect()))
    }

    /// Integer content, if any
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::UInt(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Unsigned integer content, if any
    #[must_use]
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Self::Int(n) => u64::try_from(*n).ok(),
            Self::UInt(n) => Some(*n),
            _ => None,
        }
    }

    /// Float content, widening integers
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(x) => Some(*x),
            Self::Int(n) => Some(*n as f64),
            Self::UInt(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// String content, if any
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Shared list handle, if any
    #[must_use]
    pub fn as_list(&self) -> Option<&Shared<Vec<FieldValue>>> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Whether both values are the same shared container
    #[must_use]
    pub fn same_container(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::List(a), Self::List(b)) => a.ptr_eq(b),
            (Self::Map(a), Self::Map(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::UInt(value), Self::Int)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_u64().map(Self::UInt))
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Null),
            Value::String(s) => Self::Str(s),
            Value::Array(items) => Self::list(items.into_iter().map(Self::from)),
            Value::Object(map) => Self::Map(Shared::new(
                map.into_iter().map(|(k, v)| (k, Self::from(v))).collect(),
            )),
        }
    }
}

impl Duplicate for FieldValue {
    fn alias(&self) -> Self {
        self.clone()
    }

    fn shallow_copy(&self) -> Self {
        match self {
            Self::List(items) => Self::List(items.shallow_copy()),
            Self::Map(map) => Self::Map(map.shallow_copy()),
            other => other.clone(),
        }
    }

    fn deep_copy(&self, memo: &mut CopyMemo) -> Self {
        match self {
            Self::List(items) => Self::List(items.deep_copy(memo)),
            Self::Map(map) => Self::Map(map.deep_copy(memo)),
            other => other.clone(),
        }
    }
}

/// Ordered, dynamically shaped constructor value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, FieldValue>,
}

impl Record {
    /// Create an empty record
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a field, returning the previous value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.fields.insert(name.into(), value.into())
    }

    /// Field by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Remove a field
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.shift_remove(name)
    }

    /// Field names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Take the field map
    #[must_use]
    pub fn into_fields(self) -> IndexMap<String, FieldValue> {
        self.fields
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Record {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            fields: map.into_iter().map(|(k, v)| (k, FieldValue::from(v))).collect(),
        }
    }
}

impl Duplicate for Record {
    fn alias(&self) -> Self {
        Self {
            fields: self.fields.alias(),
        }
    }

    fn deep_copy(&self, memo: &mut CopyMemo) -> Self {
        Self {
            fields: self.fields.deep_copy(memo),
        }
    }

    fn copy_fields(&self, mode: CopyMode, memo: &mut CopyMemo) -> Self {
        match mode {
            CopyMode::Shallow => Self {
                fields: self
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.shallow_copy()))
                    .collect(),
            },
            _ => self.duplicate(mode, memo),
        }
    }
}

impl Constructor for Record {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BindingRegistry, ConstructedBy};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Debug)]
    struct DynamicEnv {
        fields: Record,
        item_count: usize,
    }

    impl ConstructedBy<Record> for DynamicEnv {
        fn allocate(fields: Record) -> Self {
            Self {
                fields,
                item_count: 0,
            }
        }

        fn construct(&mut self) {
            if let Some(items) = self.fields.get("items").and_then(FieldValue::as_list) {
                items.write().push("item".into());
                self.item_count = items.read().len();
            }
        }
    }

    fn sample() -> Record {
        Record::new()
            .with("x", "x")
            .with("items", FieldValue::list([1, 2, 3].map(FieldValue::Int)))
    }

    #[test]
    fn test_from_json_config() {
        let config = json!({
            "width": 8,
            "ratio": 0.5,
            "name": "env",
            "items": [1, 2, 3],
            "nested": {"enabled": true}
        });
        let serde_json::Value::Object(map) = config else {
            unreachable!()
        };
        let record = Record::from(map);

        assert_eq!(record.names().collect::<Vec<_>>(), ["items", "name", "nested", "ratio", "width"]);
        assert_eq!(record.get("width").and_then(FieldValue::as_int), Some(8));
        assert_eq!(record.get("ratio").and_then(FieldValue::as_float), Some(0.5));
        assert_eq!(record.get("name").and_then(FieldValue::as_str), Some("env"));
        assert_eq!(record.get("items").and_then(FieldValue::as_list).map(|l| l.read().len()), Some(3));
    }

    #[test]
    fn test_large_integers_keep_precision() {
        let config = json!({"seed": u64::MAX, "offset": -3});
        let serde_json::Value::Object(map) = config else {
            unreachable!()
        };
        let record = Record::from(map);

        assert_eq!(record.get("seed"), Some(&FieldValue::UInt(u64::MAX)));
        assert_eq!(record.get("seed").and_then(FieldValue::as_uint), Some(u64::MAX));
        assert_eq!(record.get("seed").and_then(FieldValue::as_int), None);
        assert_eq!(record.get("offset").and_then(FieldValue::as_int), Some(-3));
        assert_eq!(FieldValue::from(7_u64), FieldValue::Int(7));

        let json = serde_json::to_string(&record).unwrap();
        let loaded: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.get("seed"), Some(&FieldValue::UInt(u64::MAX)));
    }

    #[test]
    fn test_serde_round_trip() {
        let record = sample();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"x":"x","items":[1,2,3]}"#);

        let loaded: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_copy_modes_on_whole_map() {
        let record = sample();
        let items = record.get("items").unwrap();

        let aliased = record.alias();
        assert!(aliased.get("items").unwrap().same_container(items));

        // As a plain value the record is one container: entries stay aliased.
        let shallow = record.shallow_copy();
        assert!(shallow.get("items").unwrap().same_container(items));

        // As a constructor each entry is copied on its own.
        let fields = record.copy_fields(CopyMode::Shallow, &mut CopyMemo::new());
        let field_items = fields.get("items").unwrap();
        assert!(!field_items.same_container(items));
        assert_eq!(field_items, items);

        let deep = record.deep_copy(&mut CopyMemo::new());
        assert!(!deep.get("items").unwrap().same_container(items));
        assert_eq!(deep, record);
    }

    #[test]
    fn test_record_as_dynamic_constructor() {
        let mut registry = BindingRegistry::new();
        registry.bind::<Record, DynamicEnv>(CopyMode::Shallow).unwrap();

        let con = sample();
        let first: DynamicEnv = registry.build(&con).unwrap();
        let second: DynamicEnv = registry.build(&con).unwrap();

        assert_eq!(first.item_count, 4);
        assert_eq!(second.item_count, 4);
        assert_eq!(con.get("items").and_then(FieldValue::as_list).map(|l| l.read().len()), Some(3));
        assert_eq!(first.fields.get("x").and_then(FieldValue::as_str), Some("x"));
    }

    #[test]
    fn test_record_without_copy_aliases_lists() {
        let mut registry = BindingRegistry::new();
        registry.bind::<Record, DynamicEnv>(CopyMode::None).unwrap();

        let con = sample();
        let env: DynamicEnv = registry.build(&con).unwrap();
        assert_eq!(env.item_count, 4);
        assert_eq!(con.get("items").and_then(FieldValue::as_list).map(|l| l.read().len()), Some(4));
    }
}
