use std::time::Duration;

use crate::{Error, Result};

/// Identifier the SDK reports to the resolver and the events service.
pub const SDK_ID: &str = "SDK_ID_RUST_CONFIDENCE";
/// Version the SDK reports to the resolver and the events service.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration for talking to the Confidence backend.
///
/// The only required setting is the client secret (api key). Everything else has a default that
/// should be used in most cases.
///
/// ```
/// # use std::time::Duration;
/// # use confidence::ApiConfig;
/// let config = ApiConfig::from_api_key("client-secret")
///     .resolve_timeout(Duration::from_secs(2))
///     .disable_telemetry(true);
/// ```
#[derive(Clone)]
pub struct ApiConfig {
    pub(crate) api_key: String,
    pub(crate) resolve_base_url: String,
    pub(crate) events_base_url: String,
    pub(crate) resolve_timeout: Duration,
    pub(crate) disable_telemetry: bool,
}

impl ApiConfig {
    /// Default base URL of the flag resolver.
    pub const DEFAULT_RESOLVE_BASE_URL: &'static str = "https://resolver.confidence.dev";

    /// Default base URL of the events service.
    pub const DEFAULT_EVENTS_BASE_URL: &'static str = "https://events.eu.confidence.dev";

    /// Default timeout for a single resolve request.
    pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a default configuration using the specified client secret.
    ///
    /// ```
    /// # use confidence::ApiConfig;
    /// ApiConfig::from_api_key("client-secret");
    /// ```
    pub fn from_api_key(api_key: impl Into<String>) -> Self {
        ApiConfig {
            api_key: api_key.into(),
            resolve_base_url: ApiConfig::DEFAULT_RESOLVE_BASE_URL.to_owned(),
            events_base_url: ApiConfig::DEFAULT_EVENTS_BASE_URL.to_owned(),
            resolve_timeout: ApiConfig::DEFAULT_RESOLVE_TIMEOUT,
            disable_telemetry: false,
        }
    }

    /// Override base URL of the resolver. An empty string keeps the default.
    pub fn resolve_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        if !base_url.is_empty() {
            self.resolve_base_url = base_url;
        }
        self
    }

    /// Override base URL of the events service. An empty string keeps the default.
    pub fn events_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        if !base_url.is_empty() {
            self.events_base_url = base_url;
        }
        self
    }

    /// Set the timeout applied to each resolve request.
    ///
    /// The timeout is picked up by resolve clients created from this configuration; clients that
    /// already exist keep their own.
    pub fn resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    /// Stop attaching latency telemetry to resolve requests.
    pub fn disable_telemetry(mut self, disable_telemetry: bool) -> Self {
        self.disable_telemetry = disable_telemetry;
        self
    }

    /// Check that the configuration can be used to build a client.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(Error::MissingApiKey);
        }
        Ok(())
    }

    /// Client secret.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Base URL of the resolver.
    pub fn get_resolve_base_url(&self) -> &str {
        &self.resolve_base_url
    }

    /// Base URL of the events service.
    pub fn get_events_base_url(&self) -> &str {
        &self.events_base_url
    }

    /// Timeout for a single resolve request.
    pub fn get_resolve_timeout(&self) -> Duration {
        self.resolve_timeout
    }

    /// Whether latency telemetry is disabled.
    pub fn is_telemetry_disabled(&self) -> bool {
        self.disable_telemetry
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &"<redacted>")
            .field("resolve_base_url", &self.resolve_base_url)
            .field("events_base_url", &self.events_base_url)
            .field("resolve_timeout", &self.resolve_timeout)
            .field("disable_telemetry", &self.disable_telemetry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{ApiConfig, Error};

    #[test]
    fn defaults() {
        let config = ApiConfig::from_api_key("test-key");
        assert_eq!(config.api_key(), "test-key");
        assert_eq!(config.get_resolve_timeout(), Duration::from_secs(10));
        assert_eq!(
            config.get_resolve_base_url(),
            ApiConfig::DEFAULT_RESOLVE_BASE_URL
        );
        assert_eq!(
            config.get_events_base_url(),
            ApiConfig::DEFAULT_EVENTS_BASE_URL
        );
        assert!(!config.is_telemetry_disabled());
    }

    #[test]
    fn resolve_timeout_overrides_default() {
        let config =
            ApiConfig::from_api_key("test-key").resolve_timeout(Duration::from_secs(5));
        assert_eq!(config.get_resolve_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn builder_methods_chain() {
        let config = ApiConfig::from_api_key("test-key")
            .resolve_timeout(Duration::from_millis(500))
            .resolve_base_url("http://localhost:8080")
            .disable_telemetry(true);
        assert_eq!(config.get_resolve_timeout(), Duration::from_millis(500));
        assert_eq!(config.get_resolve_base_url(), "http://localhost:8080");
        assert!(config.is_telemetry_disabled());
    }

    #[test]
    fn empty_base_url_keeps_default() {
        let config = ApiConfig::from_api_key("test-key")
            .resolve_base_url("")
            .events_base_url("");
        assert_eq!(
            config.get_resolve_base_url(),
            ApiConfig::DEFAULT_RESOLVE_BASE_URL
        );
        assert_eq!(
            config.get_events_base_url(),
            ApiConfig::DEFAULT_EVENTS_BASE_URL
        );
    }

    #[test]
    fn empty_api_key_fails_validation() {
        assert!(matches!(
            ApiConfig::from_api_key("").validate(),
            Err(Error::MissingApiKey)
        ));
        assert!(ApiConfig::from_api_key("test-key").validate().is_ok());
    }

    #[test]
    fn debug_redacts_api_key() {
        let debug = format!("{:?}", ApiConfig::from_api_key("super-secret"));
        assert!(!debug.contains("super-secret"));
    }
}
