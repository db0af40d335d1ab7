use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{models::Sdk, ApiConfig, Context, Error, Result};

/// Path of the publish endpoint, relative to the events base URL.
const PUBLISH_ENDPOINT: &str = "/v1/events:publish";

/// Body of `POST /v1/events:publish`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBatchRequest {
    /// Client secret.
    pub client_secret: String,
    /// SDK identity.
    pub sdk: Sdk,
    /// Time the batch was sent.
    pub send_time: DateTime<Utc>,
    /// Events in the batch.
    pub events: Vec<Event>,
}

/// A single tracked event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event definition resource name, `eventDefinitions/<name>`.
    pub event_definition: String,
    /// Time the event happened.
    pub event_time: DateTime<Utc>,
    /// Event data, including the `"context"` it was tracked in.
    pub payload: Context,
}

impl EventBatchRequest {
    /// Build a batch carrying a single event that happened at `time`.
    pub fn single(
        client_secret: String,
        event_name: &str,
        payload: Context,
        time: DateTime<Utc>,
    ) -> EventBatchRequest {
        EventBatchRequest {
            client_secret,
            sdk: Sdk::current(),
            send_time: time,
            events: vec![Event {
                event_definition: format!("eventDefinitions/{event_name}"),
                event_time: time,
                payload,
            }],
        }
    }
}

/// Uploads tracked events.
///
/// Uploading is best-effort: implementations swallow failures, at most logging them.
pub trait EventUploader: Send + Sync {
    /// Upload `batch`.
    fn upload(&self, batch: EventBatchRequest);
}

impl<T: Fn(EventBatchRequest) + Send + Sync> EventUploader for T {
    fn upload(&self, batch: EventBatchRequest) {
        self(batch);
    }
}

/// Event uploader posting batches to the events service.
pub struct HttpEventUploader {
    client: reqwest::blocking::Client,
    url: Url,
}

impl HttpEventUploader {
    /// Create an uploader for the events service configured in `config`.
    pub fn new(config: &ApiConfig) -> Result<HttpEventUploader> {
        let base_url = config.events_base_url.trim_end_matches('/');
        let url = Url::parse(&format!("{base_url}{PUBLISH_ENDPOINT}"))
            .map_err(Error::InvalidBaseUrl)?;
        let client = reqwest::blocking::Client::builder().build()?;
        Ok(HttpEventUploader { client, url })
    }
}

impl EventUploader for HttpEventUploader {
    fn upload(&self, batch: EventBatchRequest) {
        let response = match self.client.post(self.url.clone()).json(&batch).send() {
            Ok(response) => response,
            Err(err) => {
                log::warn!(target: "confidence",
                           error:display = err.without_url();
                           "failed to perform upload request");
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            log::warn!(target: "confidence", status:display = status; "failed to upload event");
        }
    }
}
