use std::time::{Duration, Instant};

use url::Url;

use crate::{
    models::{ResolveErrorMessage, ResolveRequest, ResolveResponse},
    telemetry::{self, Trace, TraceBuffer, TraceStatus, TELEMETRY_HEADER},
    ApiConfig, Error, Result,
};

/// Path of the resolve endpoint, relative to the resolver base URL.
const RESOLVE_ENDPOINT: &str = "/v1/flags:resolve";

/// Sends resolve requests to the resolver.
///
/// [`HttpResolveClient`] is the production implementation. Custom implementations can be passed
/// to [`ConfidenceBuilder::resolve_client`](crate::ConfidenceBuilder::resolve_client), e.g. to
/// serve canned responses in tests.
pub trait ResolveClient: Send + Sync {
    /// Resolve the flags listed in `request`, giving up once `request.timeout` has elapsed.
    fn send_resolve_request(&self, request: &ResolveRequest) -> Result<ResolveResponse>;
}

/// Resolve client talking to the resolver over HTTP.
///
/// Each call measures its latency, and the measurement is sent along with the following call.
pub struct HttpResolveClient {
    client: reqwest::blocking::Client,
    url: Url,
    timeout: Duration,
    disable_telemetry: bool,
    traces: TraceBuffer,
}

impl HttpResolveClient {
    /// Create a client for the resolver configured in `config`.
    ///
    /// The timeout is taken from `config` at this point. Later changes to the configuration have
    /// no effect on this client.
    pub fn new(config: &ApiConfig) -> Result<HttpResolveClient> {
        let base_url = config.resolve_base_url.trim_end_matches('/');
        let url = Url::parse(&format!("{base_url}{RESOLVE_ENDPOINT}"))
            .map_err(Error::InvalidBaseUrl)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(config.resolve_timeout)
            .build()?;

        Ok(HttpResolveClient {
            client,
            url,
            timeout: config.resolve_timeout,
            disable_telemetry: config.disable_telemetry,
            traces: TraceBuffer::new(),
        })
    }

    /// Take all traces recorded since the last request.
    pub fn drain_traces(&self) -> Vec<Trace> {
        self.traces.drain()
    }

    fn execute(&self, request: &ResolveRequest) -> Result<ResolveResponse> {
        let mut builder = self.client.post(self.url.clone()).json(request);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout.min(self.timeout));
        }
        let traces = self.traces.drain();
        if !self.disable_telemetry {
            log::debug!(target: "confidence",
                        traces = traces.len();
                        "attaching telemetry to resolve request");
            builder = builder.header(TELEMETRY_HEADER, telemetry::encode_header(traces));
        }

        let response = builder.send()?;
        let status = response.status();
        let body = response.bytes()?;

        if !status.is_success() {
            let error = serde_json::from_slice::<ResolveErrorMessage>(&body).unwrap_or_default();
            return Err(Error::UnexpectedStatus {
                status,
                code: error.code,
                message: error.message,
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

impl ResolveClient for HttpResolveClient {
    fn send_resolve_request(&self, request: &ResolveRequest) -> Result<ResolveResponse> {
        log::debug!(target: "confidence", flags:serde = request.flags; "sending resolve request");

        let start = Instant::now();
        let result = self.execute(request);
        let status = match &result {
            Ok(_) => TraceStatus::Success,
            Err(Error::Timeout(_)) => TraceStatus::Timeout,
            Err(_) => TraceStatus::Error,
        };
        self.traces.push(Trace::resolve_latency(start.elapsed(), status));

        result
    }
}
