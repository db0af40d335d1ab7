//! Wire types of the resolver API.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{schema::FlagSchema, Context, SDK_ID, SDK_VERSION};

/// Identity of the SDK making a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sdk {
    /// SDK identifier, see [`SDK_ID`].
    pub id: String,
    /// SDK version, see [`SDK_VERSION`].
    pub version: String,
}

impl Sdk {
    /// Identity of this SDK.
    pub fn current() -> Self {
        Sdk {
            id: SDK_ID.to_owned(),
            version: SDK_VERSION.to_owned(),
        }
    }
}

/// Body of `POST /v1/flags:resolve`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveRequest {
    /// Client secret.
    pub client_secret: String,
    /// Whether the resolver should record the assignment. Always `true` for flag reads.
    pub apply: bool,
    /// Merged evaluation context.
    pub evaluation_context: Context,
    /// Flags to resolve, as `flags/<name>`.
    pub flags: Vec<String>,
    /// SDK identity.
    pub sdk: Sdk,
    /// Deadline for this request, on top of the configured resolve timeout. Not sent.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl ResolveRequest {
    /// Build a request applying a single flag.
    pub fn for_flag(client_secret: String, flag_name: &str, evaluation_context: Context) -> Self {
        ResolveRequest {
            client_secret,
            apply: true,
            evaluation_context,
            flags: vec![format!("flags/{flag_name}")],
            sdk: Sdk::current(),
            timeout: None,
        }
    }
}

/// Successful response of `POST /v1/flags:resolve`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    /// Resolved flags, in request order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub resolved_flags: Vec<ResolvedFlag>,
    /// Token identifying this resolve.
    #[serde(default)]
    pub resolve_token: String,
}

/// A single flag as returned by the resolver.
///
/// `value` is kept as raw JSON: whether a number is an integer or a float is only decided when the
/// value is read against `flag_schema`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFlag {
    /// Flag resource name, `flags/<name>`.
    pub flag: String,
    /// Assigned variant resource name, empty if none.
    #[serde(default)]
    pub variant: String,
    /// Remote reason, e.g. `RESOLVE_REASON_MATCH`.
    #[serde(default)]
    pub reason: String,
    /// Variant value. Empty when no variant was assigned.
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: serde_json::Map<String, serde_json::Value>,
    /// Schema of `value`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub flag_schema: FlagSchema,
}

impl ResolvedFlag {
    /// Flag name without the `flags/` prefix.
    pub fn short_name(&self) -> &str {
        self.flag.strip_prefix("flags/").unwrap_or(&self.flag)
    }
}

/// Error body returned along with a non-success status.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ResolveErrorMessage {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
