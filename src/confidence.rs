use std::{sync::Arc, time::Duration};

use chrono::Utc;
use url::Url;

#[cfg(doc)]
use crate::ResolutionDetail;
use crate::{
    context::{ContextProvider, ContextScope},
    event_uploader::{EventBatchRequest, EventUploader, HttpEventUploader},
    models::ResolveRequest,
    resolution::{process_resolve_error, process_resolved_flag},
    resolve_client::{HttpResolveClient, ResolveClient},
    schema::SchemaKind,
    value::split_flag_string,
    ApiConfig, Context, Error, ErrorCode, FlagResolution, FlagValue, Result, Value,
};

/// Console page that replays a resolve for a given client, flag and context.
const RESOLVE_TESTER_URL: &str = "https://app.confidence.spotify.com/flags/resolver-test";

/// Key of the payload entry that carries the evaluation context of a tracked event.
const CONTEXT_PAYLOAD_KEY: &str = "context";

/// A Confidence client: reads flags and tracks events within an evaluation context.
///
/// Create one with [`ConfidenceBuilder`]. Clones share the same context; use
/// [`Confidence::with_context`] to derive a client with its own context layered on top.
///
/// # Examples
/// ```no_run
/// # use confidence::{ApiConfig, ConfidenceBuilder, Value};
/// let confidence = ConfidenceBuilder::new()
///     .api_config(ApiConfig::from_api_key("client-secret"))
///     .build()
///     .unwrap();
/// confidence.put_context("targeting_key", Value::from("user-1"));
///
/// let enabled = confidence.get_bool_value("checkout.new-flow.enabled", false);
/// ```
#[derive(Clone)]
pub struct Confidence {
    context: Arc<ContextScope>,
    config: Arc<ApiConfig>,
    resolve_client: Arc<dyn ResolveClient>,
    event_uploader: Arc<dyn EventUploader>,
}

/// Builder for [`Confidence`].
#[derive(Default)]
pub struct ConfidenceBuilder {
    api_config: Option<ApiConfig>,
    resolve_client: Option<Arc<dyn ResolveClient>>,
    event_uploader: Option<Arc<dyn EventUploader>>,
}

impl ConfidenceBuilder {
    /// Create an empty builder. [`ConfidenceBuilder::api_config`] must be set before building.
    pub fn new() -> ConfidenceBuilder {
        ConfidenceBuilder::default()
    }

    /// Set the API configuration.
    pub fn api_config(mut self, config: ApiConfig) -> ConfidenceBuilder {
        self.api_config = Some(config);
        self
    }

    /// Use a custom resolve client instead of [`HttpResolveClient`].
    pub fn resolve_client(mut self, client: impl ResolveClient + 'static) -> ConfidenceBuilder {
        self.resolve_client = Some(Arc::new(client));
        self
    }

    /// Use a custom event uploader instead of [`HttpEventUploader`].
    ///
    /// ```
    /// # use confidence::{ApiConfig, ConfidenceBuilder, EventBatchRequest};
    /// let confidence = ConfidenceBuilder::new()
    ///     .api_config(ApiConfig::from_api_key("client-secret"))
    ///     .event_uploader(|batch: EventBatchRequest| println!("{:?}", batch))
    ///     .build();
    /// ```
    pub fn event_uploader(mut self, uploader: impl EventUploader + 'static) -> ConfidenceBuilder {
        self.event_uploader = Some(Arc::new(uploader));
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingApiKey`] if no configuration was set or its API key is empty.
    /// - [`Error::InvalidBaseUrl`] if a configured base URL cannot be parsed.
    /// - [`Error::Network`] if the HTTP client cannot be initialized.
    pub fn build(self) -> Result<Confidence> {
        let config = self.api_config.ok_or(Error::MissingApiKey)?;
        config.validate()?;

        let resolve_client = match self.resolve_client {
            Some(client) => client,
            None => Arc::new(HttpResolveClient::new(&config)?),
        };
        let event_uploader = match self.event_uploader {
            Some(uploader) => uploader,
            None => Arc::new(HttpEventUploader::new(&config)?),
        };

        log::info!(target: "confidence", config:debug = config; "confidence created");

        Ok(Confidence {
            context: Arc::new(ContextScope::root()),
            config: Arc::new(config),
            resolve_client,
            event_uploader,
        })
    }
}

impl Confidence {
    /// Shorthand for [`ConfidenceBuilder::new`].
    pub fn builder() -> ConfidenceBuilder {
        ConfidenceBuilder::new()
    }

    /// Set `key` in this client's context. Setting [`Value::Null`] hides an inherited key.
    pub fn put_context(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.context.put(key.into(), value.into());
    }

    /// Hide `key` from this client's context.
    pub fn remove_context(&self, key: impl Into<String>) {
        self.context.put(key.into(), Value::Null);
    }

    /// Current merged context, as sent with resolve requests.
    pub fn get_context(&self) -> Context {
        self.context.get_context()
    }

    /// Derive a client whose context is the current context overlaid with `context`.
    ///
    /// Later writes to this client stay visible to the derived one for keys the derived client
    /// does not itself set. Writes to the derived client never affect this one.
    pub fn with_context(&self, context: Context) -> Confidence {
        let parent: Arc<dyn ContextProvider> = self.context.clone();
        Confidence {
            context: Arc::new(ContextScope::child(parent, context)),
            config: self.config.clone(),
            resolve_client: self.resolve_client.clone(),
            event_uploader: self.event_uploader.clone(),
        }
    }

    /// Read a boolean flag property.
    ///
    /// `flag` is `<flag-name>` or `<flag-name>.<dotted.property.path>`. On any error `default` is
    /// returned and the error is described in [`ResolutionDetail`].
    pub fn get_bool_flag(&self, flag: &str, default: bool) -> FlagResolution<bool> {
        self.get_flag(flag, default)
    }

    /// Like [`Confidence::get_bool_flag`], returning only the value.
    pub fn get_bool_value(&self, flag: &str, default: bool) -> bool {
        self.get_bool_flag(flag, default).value
    }

    /// Read an integer flag property.
    pub fn get_int_flag(&self, flag: &str, default: i64) -> FlagResolution<i64> {
        self.get_flag(flag, default)
    }

    /// Like [`Confidence::get_int_flag`], returning only the value.
    pub fn get_int_value(&self, flag: &str, default: i64) -> i64 {
        self.get_int_flag(flag, default).value
    }

    /// Read a floating point flag property. Integer properties are not converted.
    pub fn get_double_flag(&self, flag: &str, default: f64) -> FlagResolution<f64> {
        self.get_flag(flag, default)
    }

    /// Like [`Confidence::get_double_flag`], returning only the value.
    pub fn get_double_value(&self, flag: &str, default: f64) -> f64 {
        self.get_double_flag(flag, default).value
    }

    /// Read a string flag property.
    pub fn get_string_flag(
        &self,
        flag: &str,
        default: impl Into<String>,
    ) -> FlagResolution<String> {
        self.get_flag(flag, default.into())
    }

    /// Like [`Confidence::get_string_flag`], returning only the value.
    pub fn get_string_value(&self, flag: &str, default: impl Into<String>) -> String {
        self.get_string_flag(flag, default).value
    }

    /// Read a whole flag value, or a struct property of it.
    ///
    /// The resolution is returned as produced by [`Confidence::resolve_flag`]: a matched `null`
    /// is returned as is.
    pub fn get_object_flag(&self, flag: &str, default: Value) -> FlagResolution<Value> {
        self.resolve_flag(flag, default, SchemaKind::Struct)
    }

    /// Like [`Confidence::get_object_flag`], returning only the value.
    pub fn get_object_value(&self, flag: &str, default: Value) -> Value {
        self.get_object_flag(flag, default).value
    }

    /// Read a flag property as any [`FlagValue`] type.
    pub fn get_flag<T: FlagValue>(&self, flag: &str, default: T) -> FlagResolution<T> {
        self.resolve_flag(flag, default.clone().into(), T::KIND)
            .into_typed(default)
    }

    /// Resolve `flag` and extract its property, checking that the schema declares it as
    /// `expected`.
    ///
    /// Never fails: errors are reported in the returned [`ResolutionDetail`] along with
    /// `default`.
    pub fn resolve_flag(
        &self,
        flag: &str,
        default: Value,
        expected: SchemaKind,
    ) -> FlagResolution<Value> {
        self.resolve(flag, default, expected, None)
    }

    /// Like [`Confidence::resolve_flag`], giving up after `timeout`.
    ///
    /// The configured resolve timeout still applies; whichever is shorter wins. An expired
    /// deadline is reported as [`ErrorCode::Timeout`].
    pub fn resolve_flag_with_timeout(
        &self,
        flag: &str,
        default: Value,
        expected: SchemaKind,
        timeout: Duration,
    ) -> FlagResolution<Value> {
        self.resolve(flag, default, expected, Some(timeout))
    }

    fn resolve(
        &self,
        flag: &str,
        default: Value,
        expected: SchemaKind,
        timeout: Option<Duration>,
    ) -> FlagResolution<Value> {
        let (flag_name, property_path) = split_flag_string(flag);
        let mut request =
            ResolveRequest::for_flag(self.config.api_key.clone(), flag_name, self.get_context());
        request.timeout = timeout;

        let response = match self.resolve_client.send_resolve_request(&request) {
            Ok(response) => response,
            Err(err) => {
                log::warn!(target: "confidence",
                           flag_key = flag;
                           "error in resolving flag: {err}");
                return process_resolve_error(&err, default);
            }
        };
        log_resolve_tester_hint(flag_name, &self.config.api_key, &request.evaluation_context);

        let Some(resolved_flag) = response.resolved_flags.into_iter().next() else {
            log::debug!(target: "confidence", flag_key = flag; "flag not found");
            return FlagResolution::error(default, ErrorCode::FlagNotFound, "Flag not found");
        };

        if request.flags.first() != Some(&resolved_flag.flag) {
            log::warn!(target: "confidence",
                       flag_key = flag,
                       remote_flag:display = resolved_flag.flag;
                       "unexpected flag from remote");
            return FlagResolution::error(
                default,
                ErrorCode::FlagNotFound,
                format!("unexpected flag '{}' from remote", resolved_flag.short_name()),
            );
        }

        let resolution = process_resolved_flag(resolved_flag, property_path, default, expected);
        log::trace!(target: "confidence",
                    flag_key = flag,
                    reason:display = resolution.details.reason,
                    variant:display = resolution.details.variant;
                    "resolved flag");
        resolution
    }

    /// Track an event named `event_name`.
    ///
    /// The current context is attached under the `"context"` key of the payload. The upload runs
    /// on a background thread; the returned handle can be used to wait for it.
    ///
    /// # Panics
    ///
    /// Panics if `data` contains a `"context"` key.
    pub fn track(&self, event_name: &str, data: Context) -> TrackHandle {
        let mut payload = Context::with_capacity(data.len() + 1);
        payload.insert(
            CONTEXT_PAYLOAD_KEY.to_owned(),
            Value::Struct(self.get_context()),
        );
        for (key, value) in data {
            assert!(
                key != CONTEXT_PAYLOAD_KEY,
                "invalid key \"context\" inside the data"
            );
            payload.insert(key, value);
        }

        let batch =
            EventBatchRequest::single(self.config.api_key.clone(), event_name, payload, Utc::now());
        let uploader = self.event_uploader.clone();
        let thread_event_name = event_name.to_owned();

        let spawned = std::thread::Builder::new()
            .name("confidence-track".to_owned())
            .spawn(move || {
                log::debug!(target: "confidence",
                            event_name:display = thread_event_name;
                            "event uploading started");
                uploader.upload(batch);
                log::debug!(target: "confidence",
                            event_name:display = thread_event_name;
                            "event uploading completed");
            });

        match spawned {
            Ok(join_handle) => TrackHandle {
                join_handle: Some(join_handle),
            },
            Err(err) => {
                log::warn!(target: "confidence",
                           event_name;
                           "failed to start event upload thread, dropping event: {err}");
                TrackHandle { join_handle: None }
            }
        }
    }

    /// API configuration of this client.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }
}

impl ContextProvider for Confidence {
    fn get_context(&self) -> Context {
        self.context.get_context()
    }
}

/// Handle to an event upload started by [`Confidence::track`].
///
/// Dropping the handle detaches the upload.
pub struct TrackHandle {
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl TrackHandle {
    /// Block until the upload has finished, successfully or not.
    pub fn wait(self) {
        if let Some(join_handle) = self.join_handle {
            if join_handle.join().is_err() {
                log::warn!(target: "confidence", "event upload thread panicked");
            }
        }
    }
}

fn log_resolve_tester_hint(flag_name: &str, client_key: &str, context: &Context) {
    if !log::log_enabled!(target: "confidence", log::Level::Debug) {
        return;
    }

    let context = match serde_json::to_string(context) {
        Ok(context) => context,
        Err(err) => {
            log::debug!(target: "confidence",
                        flag_name;
                        "failed to serialize context for resolve tester hint: {err}");
            return;
        }
    };
    let flag = format!("flags/{flag_name}");
    if let Ok(url) = Url::parse_with_params(
        RESOLVE_TESTER_URL,
        &[
            ("client-key", client_key),
            ("flag", flag.as_str()),
            ("context", context.as_str()),
        ],
    ) {
        log::debug!(target: "confidence",
                    flag_name;
                    "check your flag evaluation in the resolver tester: {url}");
    }
}
