//! OpenFeature provider surface backed by [`Confidence`].
//!
//! [`FeatureProvider`] is the evaluation capability set an OpenFeature SDK expects from a
//! provider. [`ConfidenceProvider`] implements it by delegating to [`Confidence::resolve_flag`].
use std::{collections::HashMap, sync::Arc};

use crate::{
    Confidence, ErrorCode, FlagMetadata, FlagResolution, FlagValue, Reason, ResolutionDetail,
    Value,
};

/// Evaluation context flattened into a single mapping.
pub type FlattenedContext = HashMap<String, Value>;

/// Key OpenFeature uses for the evaluated subject.
pub const OPENFEATURE_TARGETING_KEY: &str = "targetingKey";

/// Key Confidence uses for the evaluated subject.
pub const TARGETING_KEY: &str = "targeting_key";

/// Provider metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Provider name.
    pub name: String,
}

/// Hook into the flag evaluation lifecycle. All stages default to doing nothing.
pub trait Hook: Send + Sync {
    /// Called before a flag is evaluated.
    fn before(&self, _flag: &str, _context: &FlattenedContext) {}
    /// Called after a flag was evaluated without error.
    fn after(&self, _flag: &str, _reason: EvaluationReason) {}
    /// Called after a flag evaluation failed.
    fn error(&self, _flag: &str, _error: &ResolutionError) {}
}

/// Reason reported to OpenFeature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluationReason {
    /// A rule matched.
    TargetingMatch,
    /// The default value was used.
    Default,
    /// The evaluation failed.
    Error,
}

impl From<Reason> for EvaluationReason {
    fn from(value: Reason) -> Self {
        match value {
            Reason::TargetingMatch => EvaluationReason::TargetingMatch,
            Reason::Default => EvaluationReason::Default,
            Reason::Error => EvaluationReason::Error,
        }
    }
}

/// Error codes defined by OpenFeature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ProviderErrorCode {
    ProviderNotReady,
    FlagNotFound,
    ParseError,
    TypeMismatch,
    TargetingKeyMissing,
    InvalidContext,
    General,
}

impl std::fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ProviderErrorCode::ProviderNotReady => "PROVIDER_NOT_READY",
            ProviderErrorCode::FlagNotFound => "FLAG_NOT_FOUND",
            ProviderErrorCode::ParseError => "PARSE_ERROR",
            ProviderErrorCode::TypeMismatch => "TYPE_MISMATCH",
            ProviderErrorCode::TargetingKeyMissing => "TARGETING_KEY_MISSING",
            ProviderErrorCode::InvalidContext => "INVALID_CONTEXT",
            ProviderErrorCode::General => "GENERAL",
        })
    }
}

impl From<ErrorCode> for ProviderErrorCode {
    fn from(value: ErrorCode) -> Self {
        match value {
            ErrorCode::ProviderNotReady => ProviderErrorCode::ProviderNotReady,
            ErrorCode::FlagNotFound => ProviderErrorCode::FlagNotFound,
            ErrorCode::ParseError => ProviderErrorCode::ParseError,
            ErrorCode::TypeMismatch => ProviderErrorCode::TypeMismatch,
            ErrorCode::TargetingKeyMissing => ProviderErrorCode::TargetingKeyMissing,
            ErrorCode::InvalidContext => ProviderErrorCode::InvalidContext,
            ErrorCode::Timeout | ErrorCode::General => ProviderErrorCode::General,
        }
    }
}

/// Error reported to OpenFeature.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ResolutionError {
    /// Error code.
    pub code: ProviderErrorCode,
    /// Human-readable description.
    pub message: String,
}

/// Result of a provider evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResolutionDetail<T> {
    /// Evaluated value, or the caller's default.
    pub value: T,
    /// Assigned variant, empty if none.
    pub variant: String,
    /// Why the value was produced.
    pub reason: EvaluationReason,
    /// Set when the evaluation failed.
    pub error: Option<ResolutionError>,
    /// Flag metadata.
    pub flag_metadata: FlagMetadata,
}

impl<T> From<FlagResolution<T>> for ProviderResolutionDetail<T> {
    fn from(value: FlagResolution<T>) -> Self {
        let FlagResolution {
            value,
            details:
                ResolutionDetail {
                    variant,
                    reason,
                    error_code,
                    error_message,
                    flag_metadata,
                },
        } = value;

        ProviderResolutionDetail {
            value,
            variant,
            reason: reason.into(),
            error: error_code.map(|code| ResolutionError {
                code: code.into(),
                message: error_message.unwrap_or_default(),
            }),
            flag_metadata,
        }
    }
}

/// Evaluation capability set of an OpenFeature provider.
pub trait FeatureProvider: Send + Sync {
    /// Provider metadata.
    fn metadata(&self) -> Metadata;

    /// Hooks the provider wants to run around evaluations.
    fn hooks(&self) -> Vec<Arc<dyn Hook>> {
        Vec::new()
    }

    /// Evaluate a boolean flag.
    fn bool_evaluation(
        &self,
        flag: &str,
        default: bool,
        context: FlattenedContext,
    ) -> ProviderResolutionDetail<bool>;

    /// Evaluate an integer flag.
    fn int_evaluation(
        &self,
        flag: &str,
        default: i64,
        context: FlattenedContext,
    ) -> ProviderResolutionDetail<i64>;

    /// Evaluate a floating point flag.
    fn float_evaluation(
        &self,
        flag: &str,
        default: f64,
        context: FlattenedContext,
    ) -> ProviderResolutionDetail<f64>;

    /// Evaluate a string flag.
    fn string_evaluation(
        &self,
        flag: &str,
        default: String,
        context: FlattenedContext,
    ) -> ProviderResolutionDetail<String>;

    /// Evaluate a structured flag.
    fn object_evaluation(
        &self,
        flag: &str,
        default: Value,
        context: FlattenedContext,
    ) -> ProviderResolutionDetail<Value>;
}

/// OpenFeature provider resolving flags with Confidence.
///
/// ```no_run
/// # use confidence::{ApiConfig, ConfidenceBuilder, Value};
/// # use confidence::openfeature::{ConfidenceProvider, FeatureProvider};
/// let confidence = ConfidenceBuilder::new()
///     .api_config(ApiConfig::from_api_key("client-secret"))
///     .build()
///     .unwrap();
/// let provider = ConfidenceProvider::new(confidence);
///
/// let detail = provider.bool_evaluation(
///     "checkout.new-flow.enabled",
///     false,
///     [("targetingKey".to_owned(), Value::from("user-1"))].into_iter().collect(),
/// );
/// ```
#[derive(Clone)]
pub struct ConfidenceProvider {
    confidence: Confidence,
}

impl ConfidenceProvider {
    /// Name reported in [`Metadata`].
    pub const NAME: &'static str = "ConfidenceFlagProvider";

    /// Create a provider resolving flags with `confidence`.
    pub fn new(confidence: Confidence) -> ConfidenceProvider {
        ConfidenceProvider { confidence }
    }

    fn evaluate<T: FlagValue>(
        &self,
        flag: &str,
        default: T,
        context: FlattenedContext,
    ) -> ProviderResolutionDetail<T> {
        self.confidence
            .with_context(process_targeting_key(context))
            .resolve_flag(flag, default.clone().into(), T::KIND)
            .into_typed(default)
            .into()
    }
}

impl FeatureProvider for ConfidenceProvider {
    fn metadata(&self) -> Metadata {
        Metadata {
            name: ConfidenceProvider::NAME.to_owned(),
        }
    }

    fn bool_evaluation(
        &self,
        flag: &str,
        default: bool,
        context: FlattenedContext,
    ) -> ProviderResolutionDetail<bool> {
        self.evaluate(flag, default, context)
    }

    fn int_evaluation(
        &self,
        flag: &str,
        default: i64,
        context: FlattenedContext,
    ) -> ProviderResolutionDetail<i64> {
        self.evaluate(flag, default, context)
    }

    fn float_evaluation(
        &self,
        flag: &str,
        default: f64,
        context: FlattenedContext,
    ) -> ProviderResolutionDetail<f64> {
        self.evaluate(flag, default, context)
    }

    fn string_evaluation(
        &self,
        flag: &str,
        default: String,
        context: FlattenedContext,
    ) -> ProviderResolutionDetail<String> {
        self.evaluate(flag, default, context)
    }

    fn object_evaluation(
        &self,
        flag: &str,
        default: Value,
        context: FlattenedContext,
    ) -> ProviderResolutionDetail<Value> {
        self.evaluate(flag, default, context)
    }
}

/// Rename OpenFeature's `targetingKey` to Confidence's `targeting_key`.
fn process_targeting_key(mut context: FlattenedContext) -> FlattenedContext {
    if let Some(targeting_key) = context.remove(OPENFEATURE_TARGETING_KEY) {
        context.insert(TARGETING_KEY.to_owned(), targeting_key);
    }
    context
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    use super::{
        process_targeting_key, ConfidenceProvider, EvaluationReason, FeatureProvider,
        ProviderErrorCode, ProviderResolutionDetail, ResolutionError,
    };
    use crate::{
        event_uploader::EventBatchRequest,
        models::{ResolveRequest, ResolveResponse},
        resolve_client::ResolveClient,
        ApiConfig, ConfidenceBuilder, Error, ErrorCode, FlagResolution, Result, Value,
    };

    struct MockResolveClient {
        response: Result<ResolveResponse>,
        requests: Arc<Mutex<Vec<ResolveRequest>>>,
    }

    impl ResolveClient for MockResolveClient {
        fn send_resolve_request(&self, request: &ResolveRequest) -> Result<ResolveResponse> {
            self.requests.lock().unwrap().push(request.clone());
            self.response.clone()
        }
    }

    fn provider(
        response: Result<ResolveResponse>,
    ) -> (ConfidenceProvider, Arc<Mutex<Vec<ResolveRequest>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let confidence = ConfidenceBuilder::new()
            .api_config(ApiConfig::from_api_key("test-key"))
            .resolve_client(MockResolveClient {
                response,
                requests: requests.clone(),
            })
            .event_uploader(|_batch: EventBatchRequest| {})
            .build()
            .unwrap();
        (ConfidenceProvider::new(confidence), requests)
    }

    fn template_response() -> ResolveResponse {
        serde_json::from_str(
            &std::fs::read_to_string("tests/data/resolve-response.json").unwrap(),
        )
        .unwrap()
    }

    fn evaluation_context() -> HashMap<String, Value> {
        HashMap::from([
            ("targetingKey".to_owned(), Value::from("user-1")),
            ("country".to_owned(), Value::from("SE")),
        ])
    }

    #[test]
    fn metadata_and_hooks() {
        let (provider, _) = provider(Ok(template_response()));
        assert_eq!(provider.metadata().name, "ConfidenceFlagProvider");
        assert!(provider.hooks().is_empty());
    }

    #[test]
    fn targeting_key_is_renamed() {
        let context = process_targeting_key(evaluation_context());
        assert_eq!(context.get("targetingKey"), None);
        assert_eq!(context.get("targeting_key"), Some(&Value::from("user-1")));
        assert_eq!(context.get("country"), Some(&Value::from("SE")));
    }

    #[test]
    fn evaluation_sends_renamed_context() {
        let (provider, requests) = provider(Ok(template_response()));

        let detail =
            provider.bool_evaluation("test-flag.boolean-key", false, evaluation_context());

        assert!(detail.value);
        assert_eq!(detail.reason, EvaluationReason::TargetingMatch);
        assert_eq!(detail.variant, "flags/test-flag/variants/treatment");
        assert_eq!(detail.error, None);

        let requests = requests.lock().unwrap();
        assert_eq!(
            requests[0].evaluation_context,
            HashMap::from([
                ("targeting_key".to_owned(), Value::from("user-1")),
                ("country".to_owned(), Value::from("SE")),
            ])
        );
    }

    #[test]
    fn typed_evaluations() {
        let (provider, _) = provider(Ok(template_response()));
        assert_eq!(
            provider
                .int_evaluation("test-flag.integer-key", 0, evaluation_context())
                .value,
            40
        );
        assert_eq!(
            provider
                .float_evaluation("test-flag.double-key", 0.0, evaluation_context())
                .value,
            20.203
        );
        assert_eq!(
            provider
                .string_evaluation("test-flag.string-key", "x".to_owned(), evaluation_context())
                .value,
            "treatment"
        );
        let object = provider
            .object_evaluation("test-flag.struct-key", Value::Null, evaluation_context())
            .value;
        assert_eq!(object.as_struct().unwrap()["integer-key"], Value::Integer(23));
    }

    #[test]
    fn type_mismatch_is_reported() {
        let (provider, _) = provider(Ok(template_response()));

        let detail = provider.bool_evaluation("test-flag.integer-key", true, evaluation_context());

        assert!(detail.value);
        assert_eq!(detail.reason, EvaluationReason::Error);
        assert_eq!(
            detail.error.map(|err| err.code),
            Some(ProviderErrorCode::TypeMismatch)
        );
    }

    #[test]
    fn resolve_error_is_reported() {
        let (provider, _) = provider(Err(Error::FlagNotFound));

        let detail = provider.int_evaluation("test-flag.integer-key", 3, evaluation_context());

        assert_eq!(detail.value, 3);
        assert_eq!(
            detail.error,
            Some(ResolutionError {
                code: ProviderErrorCode::FlagNotFound,
                message: "error when resolving, flag not found".to_owned(),
            })
        );
    }

    #[test]
    fn error_codes_translate() {
        let cases = [
            (ErrorCode::FlagNotFound, ProviderErrorCode::FlagNotFound),
            (ErrorCode::TypeMismatch, ProviderErrorCode::TypeMismatch),
            (ErrorCode::General, ProviderErrorCode::General),
            (ErrorCode::InvalidContext, ProviderErrorCode::InvalidContext),
            (ErrorCode::ProviderNotReady, ProviderErrorCode::ProviderNotReady),
            (ErrorCode::ParseError, ProviderErrorCode::ParseError),
            (ErrorCode::TargetingKeyMissing, ProviderErrorCode::TargetingKeyMissing),
            (ErrorCode::Timeout, ProviderErrorCode::General),
        ];
        for (code, expected) in cases {
            let detail: ProviderResolutionDetail<bool> =
                FlagResolution::error(false, code, "message").into();
            assert_eq!(detail.reason, EvaluationReason::Error);
            assert_eq!(
                detail.error,
                Some(ResolutionError {
                    code: expected,
                    message: "message".to_owned(),
                })
            );
        }
    }
}
