use std::{collections::HashMap, time::Duration};

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use confidence::{
    openfeature::{ConfidenceProvider, EvaluationReason, FeatureProvider, ProviderErrorCode},
    ApiConfig, Confidence, ErrorCode, EventBatchRequest, Reason, Value,
};

fn resolve_response() -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string("tests/data/resolve-response.json").unwrap())
        .unwrap()
}

fn config(server: &MockServer) -> ApiConfig {
    ApiConfig::from_api_key("test-key")
        .resolve_base_url(server.uri())
        .events_base_url(server.uri())
        .resolve_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn flag_read_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/flags:resolve"))
        .and(body_partial_json(json!({
            "evaluation_context": {"targeting_key": "user-1"},
            "flags": ["flags/test-flag"],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(resolve_response()))
        .mount(&server)
        .await;

    let config = config(&server);
    let (enabled, color, missing) = tokio::task::spawn_blocking(move || {
        let confidence = Confidence::builder().api_config(config).build().unwrap();
        confidence.put_context("targeting_key", "user-1");
        (
            confidence.get_bool_flag("test-flag.struct-key.boolean-key", true),
            confidence.get_string_value("test-flag.string-key", "blue"),
            confidence.get_int_flag("test-flag.no-such-key", 5),
        )
    })
    .await
    .unwrap();

    assert!(!enabled.value);
    assert_eq!(enabled.details.reason, Reason::TargetingMatch);
    assert_eq!(color, "treatment");
    assert_eq!(missing.value, 5);
    assert_eq!(missing.details.error_code, Some(ErrorCode::TypeMismatch));
}

#[tokio::test]
async fn unknown_flag_status_is_flag_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/flags:resolve"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"code": 5, "message": "no flag"})),
        )
        .mount(&server)
        .await;

    let config = config(&server);
    let resolution = tokio::task::spawn_blocking(move || {
        Confidence::builder()
            .api_config(config)
            .build()
            .unwrap()
            .get_double_flag("test-flag.double-key", 1.5)
    })
    .await
    .unwrap();

    assert_eq!(resolution.value, 1.5);
    assert_eq!(resolution.details.reason, Reason::Error);
    assert_eq!(resolution.details.error_code, Some(ErrorCode::FlagNotFound));
}

#[tokio::test]
async fn provider_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/flags:resolve"))
        .and(body_partial_json(json!({
            "evaluation_context": {"targeting_key": "user-1", "country": "SE"},
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(resolve_response()))
        .mount(&server)
        .await;

    let config = config(&server);
    let (matched, mismatched) = tokio::task::spawn_blocking(move || {
        let confidence = Confidence::builder().api_config(config).build().unwrap();
        confidence.put_context("country", "SE");
        let provider = ConfidenceProvider::new(confidence);
        let context =
            HashMap::from([("targetingKey".to_owned(), Value::from("user-1"))]);
        (
            provider.int_evaluation("test-flag.integer-key", 0, context.clone()),
            provider.string_evaluation("test-flag.integer-key", "x".to_owned(), context),
        )
    })
    .await
    .unwrap();

    assert_eq!(matched.value, 40);
    assert_eq!(matched.reason, EvaluationReason::TargetingMatch);
    assert_eq!(mismatched.value, "x");
    assert_eq!(
        mismatched.error.map(|err| err.code),
        Some(ProviderErrorCode::TypeMismatch)
    );
}

#[tokio::test]
async fn track_publishes_event() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/events:publish"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server);
    tokio::task::spawn_blocking(move || {
        let confidence = Confidence::builder().api_config(config).build().unwrap();
        confidence.put_context("targeting_key", "user-1");
        confidence
            .track(
                "purchase",
                HashMap::from([("amount".to_owned(), Value::Integer(3))]),
            )
            .wait();
    })
    .await
    .unwrap();

    let requests = server.received_requests().await.unwrap();
    let batch: EventBatchRequest = requests[0].body_json().unwrap();
    assert_eq!(batch.client_secret, "test-key");
    assert_eq!(batch.sdk.id, "SDK_ID_RUST_CONFIDENCE");
    assert_eq!(batch.events.len(), 1);
    assert_eq!(batch.events[0].event_definition, "eventDefinitions/purchase");
    assert_eq!(batch.events[0].payload["amount"], Value::Integer(3));
    assert_eq!(
        batch.events[0].payload["context"],
        Value::Struct(HashMap::from([(
            "targeting_key".to_owned(),
            Value::from("user-1")
        )]))
    );
}

#[tokio::test]
async fn failed_upload_is_swallowed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/events:publish"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server);
    tokio::task::spawn_blocking(move || {
        Confidence::builder()
            .api_config(config)
            .build()
            .unwrap()
            .track("purchase", HashMap::new())
            .wait();
    })
    .await
    .unwrap();
}
