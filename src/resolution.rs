use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    models::ResolvedFlag,
    schema::{normalize, type_for_path, SchemaKind},
    value::extract_property_value,
    Error, Value,
};

/// Why a flag read produced its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    /// The resolver matched a rule and assigned a variant.
    TargetingMatch,
    /// The resolver did not assign a variant; the caller's default is returned.
    #[default]
    Default,
    /// The read failed; the caller's default is returned.
    Error,
}

impl Reason {
    /// Wire name of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::TargetingMatch => "TARGETING_MATCH",
            Reason::Default => "DEFAULT",
            Reason::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable error codes reported by failed flag reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum ErrorCode {
    ProviderNotReady,
    FlagNotFound,
    ParseError,
    TypeMismatch,
    TargetingKeyMissing,
    InvalidContext,
    Timeout,
    General,
}

impl ErrorCode {
    /// Wire name of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ProviderNotReady => "PROVIDER_NOT_READY",
            ErrorCode::FlagNotFound => "FLAG_NOT_FOUND",
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::TypeMismatch => "TYPE_MISMATCH",
            ErrorCode::TargetingKeyMissing => "TARGETING_KEY_MISSING",
            ErrorCode::InvalidContext => "INVALID_CONTEXT",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::General => "GENERAL",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form metadata attached to a resolution.
pub type FlagMetadata = HashMap<String, Value>;

/// Details of how a flag value was produced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolutionDetail {
    /// Name of the assigned variant, empty if none was assigned.
    pub variant: String,
    /// Why the value was produced.
    pub reason: Reason,
    /// Set when `reason` is [`Reason::Error`].
    pub error_code: Option<ErrorCode>,
    /// Human-readable description of the error.
    pub error_message: Option<String>,
    /// Flag metadata.
    pub flag_metadata: FlagMetadata,
}

impl ResolutionDetail {
    pub(crate) fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ResolutionDetail {
            reason: Reason::Error,
            error_code: Some(code),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Returns `true` if the read failed.
    pub fn is_error(&self) -> bool {
        self.reason == Reason::Error
    }
}

/// A flag value together with the details of its resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagResolution<T> {
    /// Resolved value, or the caller's default.
    pub value: T,
    /// Resolution details.
    pub details: ResolutionDetail,
}

impl<T> FlagResolution<T> {
    pub(crate) fn error(value: T, code: ErrorCode, message: impl Into<String>) -> Self {
        FlagResolution {
            value,
            details: ResolutionDetail::error(code, message),
        }
    }
}

/// Types a flag property can be read as.
pub trait FlagValue: Clone + Into<Value> {
    /// Schema kind a property must have to be read as `Self`.
    const KIND: SchemaKind;
    /// Name used in conversion error messages.
    const TYPE_NAME: &'static str;

    /// Convert a resolved value. Returns `None` if `value` has a different type.
    fn from_value(value: Value) -> Option<Self>;
}

impl FlagValue for bool {
    const KIND: SchemaKind = SchemaKind::Boolean;
    const TYPE_NAME: &'static str = "boolean";

    fn from_value(value: Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FlagValue for i64 {
    const KIND: SchemaKind = SchemaKind::Integer;
    const TYPE_NAME: &'static str = "int";

    fn from_value(value: Value) -> Option<Self> {
        value.as_i64()
    }
}

impl FlagValue for f64 {
    const KIND: SchemaKind = SchemaKind::Double;
    const TYPE_NAME: &'static str = "float";

    fn from_value(value: Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FlagValue for String {
    const KIND: SchemaKind = SchemaKind::String;
    const TYPE_NAME: &'static str = "string";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl FlagValue for Value {
    const KIND: SchemaKind = SchemaKind::Struct;
    const TYPE_NAME: &'static str = "object";

    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

impl FlagResolution<Value> {
    /// Convert a generic resolution into a typed one.
    ///
    /// Anything but a targeting match, or a matched `null`, yields `default` with the details
    /// unchanged. A value of the wrong type yields `default` with a `TYPE_MISMATCH` error.
    pub fn into_typed<T: FlagValue>(self, default: T) -> FlagResolution<T> {
        let FlagResolution { value, details } = self;
        if details.reason != Reason::TargetingMatch || value.is_null() {
            return FlagResolution {
                value: default,
                details,
            };
        }

        match T::from_value(value) {
            Some(value) => FlagResolution { value, details },
            None => FlagResolution::error(
                default,
                ErrorCode::TypeMismatch,
                format!("Unable to convert response property to {}", T::TYPE_NAME),
            ),
        }
    }
}

/// Remote reasons that carry an error instead of a value.
const REMOTE_REASON_TARGETING_KEY_ERROR: &str = "RESOLVE_REASON_TARGETING_KEY_ERROR";
const REMOTE_REASON_ERROR: &str = "RESOLVE_REASON_ERROR";

/// Turn a flag returned by the resolver into the value at `property_path`, checked against
/// `expected`.
pub(crate) fn process_resolved_flag(
    flag: ResolvedFlag,
    property_path: &str,
    default: Value,
    expected: SchemaKind,
) -> FlagResolution<Value> {
    match flag.reason.as_str() {
        REMOTE_REASON_TARGETING_KEY_ERROR => {
            return FlagResolution::error(
                default,
                ErrorCode::TargetingKeyMissing,
                "targeting key is missing or has an unexpected type",
            );
        }
        REMOTE_REASON_ERROR => {
            return FlagResolution::error(
                default,
                ErrorCode::General,
                "the resolver failed to resolve the flag",
            );
        }
        _ => {}
    }

    if flag.value.is_empty() {
        return FlagResolution {
            value: default,
            details: ResolutionDetail {
                reason: Reason::Default,
                ..Default::default()
            },
        };
    }

    let schema = &flag.flag_schema.schema;
    match type_for_path(schema, property_path) {
        Ok(kind) if kind == expected => {}
        Ok(kind) => {
            log::warn!(target: "confidence",
                       flag:display = flag.flag,
                       property_path,
                       kind:display = kind,
                       expected:display = expected;
                       "property has an unexpected type");
            return schema_mismatch(default, property_path);
        }
        Err(err) => {
            log::warn!(target: "confidence",
                       flag:display = flag.flag,
                       property_path;
                       "failed to find property in flag schema: {err}");
            return schema_mismatch(default, property_path);
        }
    }

    let extracted = match normalize("", flag.value, schema) {
        Ok(values) => extract_property_value(property_path, values),
        Err(err) => {
            log::warn!(target: "confidence",
                       flag:display = flag.flag;
                       "resolved value does not match flag schema: {err}");
            None
        }
    };

    match extracted {
        Some(value) => FlagResolution {
            value,
            details: ResolutionDetail {
                variant: flag.variant,
                reason: Reason::TargetingMatch,
                ..Default::default()
            },
        },
        None => FlagResolution::error(
            default,
            ErrorCode::TypeMismatch,
            "Unable to extract property value from resolve response",
        ),
    }
}

fn schema_mismatch(default: Value, property_path: &str) -> FlagResolution<Value> {
    FlagResolution::error(
        default,
        ErrorCode::TypeMismatch,
        format!("schema for property {property_path} does not match the expected type"),
    )
}

/// Turn a failed resolve request into a resolution carrying `default`.
pub(crate) fn process_resolve_error(err: &Error, default: Value) -> FlagResolution<Value> {
    let message = match err {
        Error::FlagNotFound => "error when resolving, flag not found".to_owned(),
        err => format!("error when resolving, returning default value: {err}"),
    };
    FlagResolution::error(default, err.error_code(), message)
}
