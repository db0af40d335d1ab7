use std::sync::Arc;

use reqwest::StatusCode;
use thiserror::Error;

use crate::ErrorCode;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// gRPC status code the resolver uses for an unknown flag.
const GRPC_NOT_FOUND: i32 = 5;
/// gRPC status code the resolver uses for a malformed evaluation context.
const GRPC_INVALID_ARGUMENT: i32 = 3;

/// Errors that can be returned by the Confidence SDK.
///
/// Flag accessors never return these directly: every failure during a flag read is folded into a
/// [`ResolutionDetail`](crate::ResolutionDetail) carrying the caller's default value. Use
/// [`Error::error_code`] to see which code a given error maps to.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The API key (client secret) is empty.
    #[error("api_key is missing, please provide a client secret")]
    MissingApiKey,

    /// A configured base URL could not be parsed.
    #[error("invalid base_url configuration")]
    InvalidBaseUrl(#[source] url::ParseError),

    /// The request did not complete within the configured resolve timeout.
    // reqwest::Error is not clonable, so we're wrapping it in an Arc.
    #[error("request to the resolver service timed out")]
    Timeout(#[source] Arc<reqwest::Error>),

    /// The request could not be performed (connection refused, DNS failure, ...).
    #[error(transparent)]
    Network(Arc<reqwest::Error>),

    /// The resolver answered with a non-success status.
    #[error("got '{status}' error from the resolver service: {message}")]
    UnexpectedStatus {
        /// HTTP status of the response.
        status: StatusCode,
        /// gRPC status code from the error body, `0` if the body did not carry one.
        code: i32,
        /// Error message from the error body.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("error parsing resolve response")]
    Deserialization(#[source] Arc<serde_json::Error>),

    /// The resolver does not know the requested flag.
    #[error("flag not found")]
    FlagNotFound,
}

impl Error {
    /// Stable error code reported in resolution details for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Error::Timeout(_) => ErrorCode::Timeout,
            Error::Deserialization(_) => ErrorCode::ParseError,
            Error::FlagNotFound => ErrorCode::FlagNotFound,
            Error::UnexpectedStatus { code, .. } if *code == GRPC_NOT_FOUND => {
                ErrorCode::FlagNotFound
            }
            Error::UnexpectedStatus { code, .. } if *code == GRPC_INVALID_ARGUMENT => {
                ErrorCode::InvalidContext
            }
            Error::MissingApiKey
            | Error::InvalidBaseUrl(_)
            | Error::Network(_)
            | Error::UnexpectedStatus { .. } => ErrorCode::General,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        let value = value.without_url();
        if value.is_timeout() {
            Error::Timeout(Arc::new(value))
        } else {
            Error::Network(Arc::new(value))
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Deserialization(Arc::new(value))
    }
}
