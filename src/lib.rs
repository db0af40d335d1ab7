//! The Rust SDK for Confidence, a feature flagging and experimentation platform.
//!
//! # Overview
//!
//! The SDK revolves around a [`Confidence`] client that reads feature flag values for an
//! evaluation [`Context`]. Every read sends the current context to the remote resolver, which
//! assigns a variant and returns the flag value together with its schema. The client checks the
//! requested property against the schema and returns it as a [`FlagResolution`].
//!
//! Flags are addressed as `<flag-name>` or `<flag-name>.<dotted.property.path>`:
//!
//! ```no_run
//! # use confidence::{ApiConfig, Confidence};
//! let confidence = Confidence::builder()
//!     .api_config(ApiConfig::from_api_key("client-secret"))
//!     .build()
//!     .unwrap();
//! confidence.put_context("targeting_key", "user-1");
//!
//! let color = confidence.get_string_value("hawkflag.color", "blue");
//! ```
//!
//! Events can be sent with [`Confidence::track`]. The [`openfeature`] module exposes the client
//! as an OpenFeature provider.
//!
//! # Error Handling
//!
//! Flag reads never fail: on any error the caller's default is returned and the problem is
//! described in [`ResolutionDetail`] with an [`ErrorCode`]. Fallible setup and transport
//! operations return [`Error`].
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging
//! messages, under the `confidence` target. Consider integrating a `log`-compatible logger
//! implementation for better visibility into SDK operations. At debug level, every resolve logs a
//! link to the resolver tester for the evaluated flag and context.
//!
//! # Examples
//!
//! Examples can be found in the `demos` directory of the `confidence` crate repository.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod confidence;
mod config;
mod context;
mod error;
mod event_uploader;
pub mod models;
pub mod openfeature;
mod resolution;
mod resolve_client;
pub mod schema;
pub mod telemetry;
mod value;

pub use confidence::{Confidence, ConfidenceBuilder, TrackHandle};
pub use config::{ApiConfig, SDK_ID, SDK_VERSION};
pub use context::{Context, ContextProvider};
pub use error::{Error, Result};
pub use event_uploader::{Event, EventBatchRequest, EventUploader, HttpEventUploader};
pub use models::{ResolveRequest, ResolveResponse, ResolvedFlag, Sdk};
pub use resolution::{ErrorCode, FlagMetadata, FlagResolution, FlagValue, Reason, ResolutionDetail};
pub use resolve_client::{HttpResolveClient, ResolveClient};
pub use schema::SchemaKind;
pub use value::Value;
