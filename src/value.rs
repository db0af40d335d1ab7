use std::collections::HashMap;

use derive_more::From;
use serde::{Deserialize, Serialize};

/// A value produced by flag resolution, or stored in an evaluation context.
///
/// `Integer` and `Double` are distinct: flag values are only turned into one or the other by
/// checking the flag schema, so a `doubleSchema` property written as `3` on the wire comes out as
/// `Double(3.0)`. An `intSchema` property written as `3.0` is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, From)]
#[serde(untagged)]
pub enum Value {
    /// Absent value. In a context overlay, removes the key from the merged view.
    #[from(ignore)]
    Null,
    /// A boolean.
    Boolean(bool),
    /// A 64-bit signed integer.
    Integer(i64),
    /// A 64-bit float.
    Double(f64),
    /// A string.
    String(String),
    /// A list of values.
    List(Vec<Value>),
    /// A nested mapping.
    Struct(HashMap<String, Value>),
}

impl Value {
    /// Returns the boolean if this is a [`Value::Boolean`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the integer if this is a [`Value::Integer`].
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the float if this is a [`Value::Double`]. Integers are not widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string if this is a [`Value::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the mapping if this is a [`Value::Struct`].
    pub fn as_struct(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Struct(v) => Some(v),
            _ => None,
        }
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

/// Generic conversion, used where no schema says otherwise. Numbers that fit an `i64` become
/// [`Value::Integer`].
impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(v) => Value::Boolean(v),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map_or(Value::Null, Value::Double),
            },
            serde_json::Value::String(v) => Value::String(v),
            serde_json::Value::Array(v) => Value::List(v.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(v) => {
                Value::Struct(v.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Split `"<flag>.<path>"` on the first dot. The path is empty when there is no dot.
pub(crate) fn split_flag_string(flag: &str) -> (&str, &str) {
    flag.split_once('.').unwrap_or((flag, ""))
}

/// Descend `values` along the dotted `path`.
///
/// An empty path yields the whole mapping, a missing leaf yields [`Value::Null`]. Returns `None`
/// when an intermediate segment is not a nested mapping.
pub(crate) fn extract_property_value(
    path: &str,
    mut values: HashMap<String, Value>,
) -> Option<Value> {
    if path.is_empty() {
        return Some(Value::Struct(values));
    }
    match path.split_once('.') {
        None => Some(values.remove(path).unwrap_or(Value::Null)),
        Some((head, tail)) => match values.remove(head) {
            Some(Value::Struct(nested)) => extract_property_value(tail, nested),
            _ => None,
        },
    }
}
