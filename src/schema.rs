//! Flag schemas sent by the resolver, and the schema-directed decoding of flag values.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::Value;

/// `TryParse` allows a schema node to fail parsing without failing the parsing of the whole
/// response. A node that failed to parse is reported when a flag read actually walks over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TryParse<T> {
    /// Successfully parsed.
    Parsed(T),
    /// Parsing failed.
    ParseFailed(serde_json::Value),
}

impl<'a, T> From<&'a TryParse<T>> for Option<&'a T> {
    fn from(value: &TryParse<T>) -> Option<&T> {
        match value {
            TryParse::Parsed(v) => Some(v),
            TryParse::ParseFailed(_) => None,
        }
    }
}

/// Schema properties by name.
pub type SchemaMap = HashMap<String, TryParse<SchemaNode>>;

/// Schema of a resolved flag value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlagSchema {
    /// Top-level properties.
    #[serde(default)]
    pub schema: SchemaMap,
}

/// Schema of a single property. Exactly one tag is expected to be set.
///
/// A tag is set when its key is present, whatever its value: `{"intSchema": null}` is an int.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct SchemaNode {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub bool_schema: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub string_schema: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub int_schema: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub double_schema: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub struct_schema: Option<FlagSchema>,
}

/// Only called for keys that are present, so a `null` still yields `Some`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?.unwrap_or_default()))
}

impl SchemaNode {
    /// Kind of the first tag present, checked in the order bool, string, int, double, struct.
    fn kind(&self) -> Option<SchemaKind> {
        if self.bool_schema.is_some() {
            Some(SchemaKind::Boolean)
        } else if self.string_schema.is_some() {
            Some(SchemaKind::String)
        } else if self.int_schema.is_some() {
            Some(SchemaKind::Integer)
        } else if self.double_schema.is_some() {
            Some(SchemaKind::Double)
        } else if self.struct_schema.is_some() {
            Some(SchemaKind::Struct)
        } else {
            None
        }
    }
}

/// Primitive kind of a schema property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// `boolSchema`.
    Boolean,
    /// `stringSchema`.
    String,
    /// `intSchema`, decoded as `i64`.
    Integer,
    /// `doubleSchema`, decoded as `f64`.
    Double,
    /// `structSchema`, or the whole flag value.
    Struct,
}

impl std::fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SchemaKind::Boolean => "boolean",
            SchemaKind::String => "string",
            SchemaKind::Integer => "integer",
            SchemaKind::Double => "double",
            SchemaKind::Struct => "struct",
        })
    }
}

/// Mismatch between a flag value, a property path and the flag schema.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A property is missing from the schema, or its schema node is malformed.
    #[error("schema was not in the expected format")]
    Malformed,
    /// The schema node for the property carries no recognized tag.
    #[error("unable to find property type in schema {0}")]
    UnknownPropertyType(String),
    /// The path continues below a property that is not a struct.
    #[error("unable to find property in schema {0}")]
    PropertyNotFound(String),
    /// A value does not have the shape its schema requires.
    #[error("value of property {path} is not a valid {kind}")]
    UnexpectedValue {
        /// Dotted path of the property.
        path: String,
        /// Kind required by the schema.
        kind: SchemaKind,
    },
}

/// Walk `schema` along the dotted `path` and return the kind of the property it ends at. An empty
/// path designates the whole flag value, which is a struct.
pub(crate) fn type_for_path(schema: &SchemaMap, path: &str) -> Result<SchemaKind, SchemaError> {
    if path.is_empty() {
        return Ok(SchemaKind::Struct);
    }

    let (head, tail) = match path.split_once('.') {
        Some((head, tail)) => (head, Some(tail)),
        None => (path, None),
    };

    let node: &SchemaNode = schema
        .get(head)
        .and_then(Option::<&SchemaNode>::from)
        .ok_or(SchemaError::Malformed)?;

    match tail {
        None => node
            .kind()
            .ok_or_else(|| SchemaError::UnknownPropertyType(path.to_owned())),
        Some(tail) => match &node.struct_schema {
            Some(nested) => type_for_path(&nested.schema, tail),
            None => Err(SchemaError::PropertyNotFound(path.to_owned())),
        },
    }
}

/// Turn a decoded flag value into a [`Value`] tree, resolving every number to an integer or a
/// float according to `schema`.
///
/// `base_path` is the dotted prefix (with its trailing dot) of the properties in `values`, and is
/// always looked up against the root `schema`.
pub(crate) fn normalize(
    base_path: &str,
    values: serde_json::Map<String, serde_json::Value>,
    schema: &SchemaMap,
) -> Result<HashMap<String, Value>, SchemaError> {
    values
        .into_iter()
        .map(|(key, value)| {
            let path = format!("{base_path}{key}");
            let kind = type_for_path(schema, &path)?;
            let value = normalize_value(&path, value, kind, schema)?;
            Ok((key, value))
        })
        .collect()
}

fn normalize_value(
    path: &str,
    value: serde_json::Value,
    kind: SchemaKind,
    schema: &SchemaMap,
) -> Result<Value, SchemaError> {
    let unexpected = || SchemaError::UnexpectedValue {
        path: path.to_owned(),
        kind,
    };

    match (kind, value) {
        (_, serde_json::Value::Null) => Ok(Value::Null),
        (SchemaKind::Integer, serde_json::Value::Number(n)) => {
            n.as_i64().map(Value::Integer).ok_or_else(unexpected)
        }
        (SchemaKind::Double, serde_json::Value::Number(n)) => {
            n.as_f64().map(Value::Double).ok_or_else(unexpected)
        }
        (SchemaKind::Struct, serde_json::Value::Object(nested)) => {
            normalize(&format!("{path}."), nested, schema).map(Value::Struct)
        }
        (SchemaKind::Integer | SchemaKind::Double | SchemaKind::Struct, _) => Err(unexpected()),
        (SchemaKind::Boolean | SchemaKind::String, value) => Ok(Value::from(value)),
    }
}
