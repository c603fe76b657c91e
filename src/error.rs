//! Error types for the desklink helpdesk client.
//!
//! This module defines `DeskError`, the unified error type returned by every
//! fallible operation in the crate. Each failure kind is its own variant so
//! callers can `match` on it (or on [`ErrorCategory`] via [`DeskError::kind`])
//! instead of inspecting message strings.
//!
//! # Security
//!
//! All error messages are sanitized to ensure API keys are never leaked
//! in logs or error responses. Use `sanitize_message()` when constructing
//! error messages from external sources.

use std::time::Duration;

use chrono::Utc;
use thiserror::Error;

use crate::decode::MALFORMED_FIELD_MARKER;
use crate::models::ErrorBody;
use crate::rate_limit::RateLimitInfo;

/// Delay suggested to callers before retrying after a 5xx response.
const SERVER_ERROR_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Delay suggested to callers before retrying after a timeout.
const TIMEOUT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Unified error type for all desklink operations.
///
/// Transport failures keep their low-level `reqwest` or `serde_json` cause
/// reachable through [`std::error::Error::source`]. API failures carry the
/// [`ErrorBody`] returned by the server, or a locally synthesized one when
/// the server sent nothing usable.
#[derive(Error, Debug)]
pub enum DeskError {
    /// Configuration error - missing or invalid environment variables.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP client initialization failed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// A caller-supplied argument was rejected before any request was made.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Connection refused, DNS failure, TLS failure or a broken body stream.
    #[error("network failure during {operation}: {source}")]
    NetworkFailure {
        /// The operation that failed (e.g. `GET /tickets`).
        operation: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out.
    #[error("request timed out after {duration:?} during {operation} - the server may be slow or unreachable")]
    RequestTimedOut {
        /// How long we waited before timing out.
        duration: Duration,
        /// The operation that timed out.
        operation: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// A successful response body could not be decoded.
    #[error("failed to parse response from {operation}: {hint}")]
    ResponseParseFailed {
        /// The operation whose response failed to decode.
        operation: String,
        /// Human-readable hint about the likely cause.
        hint: String,
        /// Leading part of the offending body.
        body_preview: String,
        /// The decode error.
        #[source]
        source: serde_json::Error,
    },

    /// A single field held a value none of its accepted wire shapes match.
    #[error("malformed field in {operation}: {message}")]
    MalformedField {
        /// The operation whose response contained the field.
        operation: String,
        /// Description of the rejected value.
        message: String,
        /// The decode error.
        #[source]
        source: serde_json::Error,
    },

    /// HTTP 401 - likely an invalid API key.
    #[error("{message}")]
    AuthenticationFailed {
        /// Human-readable message.
        message: String,
        /// Server-provided or synthesized error body.
        body: ErrorBody,
    },

    /// HTTP 403.
    #[error("{message}")]
    AccessDenied {
        /// Human-readable message.
        message: String,
        /// Server-provided or synthesized error body.
        body: ErrorBody,
    },

    /// HTTP 400. The body carries the per-field validation errors.
    #[error("{message}")]
    ValidationFailed {
        /// Human-readable message.
        message: String,
        /// Server-provided or synthesized error body.
        body: ErrorBody,
    },

    /// HTTP 429.
    #[error("{message}")]
    RateLimitExceeded {
        /// Human-readable message.
        message: String,
        /// Server-provided or synthesized error body.
        body: ErrorBody,
        /// Rate limit window observed on the rejected response.
        rate_limit: RateLimitInfo,
    },

    /// HTTP 404.
    #[error("{message}")]
    NotFound {
        /// Human-readable message.
        message: String,
        /// Server-provided or synthesized error body.
        body: ErrorBody,
    },

    /// HTTP 405.
    #[error("{message}")]
    MethodNotAllowed {
        /// Human-readable message.
        message: String,
        /// Server-provided or synthesized error body.
        body: ErrorBody,
    },

    /// HTTP 415.
    #[error("{message}")]
    UnsupportedMediaType {
        /// Human-readable message.
        message: String,
        /// Server-provided or synthesized error body.
        body: ErrorBody,
    },

    /// HTTP 500, 502, 503 or 504.
    #[error("{message} (HTTP {status})")]
    ServerError {
        /// The specific status code.
        status: u16,
        /// Human-readable message.
        message: String,
        /// Server-provided or synthesized error body.
        body: ErrorBody,
    },

    /// Any other non-success status.
    #[error("{message}")]
    GenericApiFailure {
        /// The status code returned.
        status: u16,
        /// Human-readable message.
        message: String,
        /// Server-provided or synthesized error body.
        body: ErrorBody,
    },
}

/// Fieldless discriminant of [`DeskError`], convenient for `match` and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// See [`DeskError::Config`].
    Config,
    /// See [`DeskError::HttpClient`].
    HttpClient,
    /// See [`DeskError::InvalidArgument`].
    InvalidArgument,
    /// See [`DeskError::NetworkFailure`].
    NetworkFailure,
    /// See [`DeskError::RequestTimedOut`].
    RequestTimedOut,
    /// See [`DeskError::ResponseParseFailed`].
    ResponseParseFailed,
    /// See [`DeskError::MalformedField`].
    MalformedField,
    /// See [`DeskError::AuthenticationFailed`].
    AuthenticationFailed,
    /// See [`DeskError::AccessDenied`].
    AccessDenied,
    /// See [`DeskError::ValidationFailed`].
    ValidationFailed,
    /// See [`DeskError::RateLimitExceeded`].
    RateLimitExceeded,
    /// See [`DeskError::NotFound`].
    NotFound,
    /// See [`DeskError::MethodNotAllowed`].
    MethodNotAllowed,
    /// See [`DeskError::UnsupportedMediaType`].
    UnsupportedMediaType,
    /// See [`DeskError::ServerError`].
    ServerError,
    /// See [`DeskError::GenericApiFailure`].
    GenericApiFailure,
}

impl DeskError {
    /// Creates a configuration error for a missing environment variable.
    pub fn missing_env(var_name: &str) -> Self {
        DeskError::Config(format!(
            "missing required environment variable: {}",
            var_name
        ))
    }

    /// Creates a configuration error for an invalid value.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        DeskError::Config(message.into())
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        DeskError::InvalidArgument(message.into())
    }

    /// Wraps a transport error, separating timeouts from other network failures.
    pub fn transport(source: reqwest::Error, operation: impl Into<String>, timeout: Duration) -> Self {
        if source.is_timeout() {
            DeskError::RequestTimedOut {
                duration: timeout,
                operation: operation.into(),
                source,
            }
        } else {
            DeskError::NetworkFailure {
                operation: operation.into(),
                source,
            }
        }
    }

    /// Wraps a decode error raised while reading a successful response.
    ///
    /// Errors raised by the tolerant field decoders become `MalformedField`;
    /// everything else is reported as `ResponseParseFailed` with a hint that
    /// the API may have changed shape.
    pub fn decode(source: serde_json::Error, operation: impl Into<String>, body_preview: &str) -> Self {
        let text = source.to_string();
        if let Some(idx) = text.find(MALFORMED_FIELD_MARKER) {
            let message = text[idx + MALFORMED_FIELD_MARKER.len()..].to_string();
            return DeskError::MalformedField {
                operation: operation.into(),
                message,
                source,
            };
        }

        DeskError::ResponseParseFailed {
            operation: operation.into(),
            hint: format!(
                "{text}; the API response shape may have changed, check for a newer client version"
            ),
            body_preview: body_preview.to_string(),
            source,
        }
    }

    /// Returns the fieldless category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorCategory {
        match self {
            DeskError::Config(_) => ErrorCategory::Config,
            DeskError::HttpClient(_) => ErrorCategory::HttpClient,
            DeskError::InvalidArgument(_) => ErrorCategory::InvalidArgument,
            DeskError::NetworkFailure { .. } => ErrorCategory::NetworkFailure,
            DeskError::RequestTimedOut { .. } => ErrorCategory::RequestTimedOut,
            DeskError::ResponseParseFailed { .. } => ErrorCategory::ResponseParseFailed,
            DeskError::MalformedField { .. } => ErrorCategory::MalformedField,
            DeskError::AuthenticationFailed { .. } => ErrorCategory::AuthenticationFailed,
            DeskError::AccessDenied { .. } => ErrorCategory::AccessDenied,
            DeskError::ValidationFailed { .. } => ErrorCategory::ValidationFailed,
            DeskError::RateLimitExceeded { .. } => ErrorCategory::RateLimitExceeded,
            DeskError::NotFound { .. } => ErrorCategory::NotFound,
            DeskError::MethodNotAllowed { .. } => ErrorCategory::MethodNotAllowed,
            DeskError::UnsupportedMediaType { .. } => ErrorCategory::UnsupportedMediaType,
            DeskError::ServerError { .. } => ErrorCategory::ServerError,
            DeskError::GenericApiFailure { .. } => ErrorCategory::GenericApiFailure,
        }
    }

    /// Returns the HTTP status code for API failures.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            DeskError::AuthenticationFailed { .. } => Some(401),
            DeskError::AccessDenied { .. } => Some(403),
            DeskError::ValidationFailed { .. } => Some(400),
            DeskError::RateLimitExceeded { .. } => Some(429),
            DeskError::NotFound { .. } => Some(404),
            DeskError::MethodNotAllowed { .. } => Some(405),
            DeskError::UnsupportedMediaType { .. } => Some(415),
            DeskError::ServerError { status, .. } | DeskError::GenericApiFailure { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Returns the human-readable message, without the status suffix of
    /// server errors.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            DeskError::AuthenticationFailed { message, .. }
            | DeskError::AccessDenied { message, .. }
            | DeskError::ValidationFailed { message, .. }
            | DeskError::RateLimitExceeded { message, .. }
            | DeskError::NotFound { message, .. }
            | DeskError::MethodNotAllowed { message, .. }
            | DeskError::UnsupportedMediaType { message, .. }
            | DeskError::ServerError { message, .. }
            | DeskError::GenericApiFailure { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Returns the error body for API failures.
    #[must_use]
    pub fn error_body(&self) -> Option<&ErrorBody> {
        match self {
            DeskError::AuthenticationFailed { body, .. }
            | DeskError::AccessDenied { body, .. }
            | DeskError::ValidationFailed { body, .. }
            | DeskError::RateLimitExceeded { body, .. }
            | DeskError::NotFound { body, .. }
            | DeskError::MethodNotAllowed { body, .. }
            | DeskError::UnsupportedMediaType { body, .. }
            | DeskError::ServerError { body, .. }
            | DeskError::GenericApiFailure { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns the rate limit window carried by a `RateLimitExceeded` error.
    #[must_use]
    pub fn rate_limit(&self) -> Option<RateLimitInfo> {
        match self {
            DeskError::RateLimitExceeded { rate_limit, .. } => Some(*rate_limit),
            _ => None,
        }
    }

    /// Returns true if this error is transient and the caller may retry.
    ///
    /// The client never retries on its own; this is a hint for callers.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            DeskError::RateLimitExceeded { .. } => true,
            DeskError::RequestTimedOut { .. } => true,
            DeskError::ServerError { .. } => true,
            DeskError::NetworkFailure { source, .. } => source.is_connect(),
            _ => false,
        }
    }

    /// Returns true if this is a rate limit error, indicating the caller should back off.
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, DeskError::RateLimitExceeded { .. })
    }

    /// Returns the suggested delay before retry, if any.
    ///
    /// For rate limit errors this is the time left until the observed
    /// window resets, when the server sent a reset in the future.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            DeskError::RateLimitExceeded { rate_limit, .. } => {
                rate_limit.time_until_reset(Utc::now())
            }
            DeskError::ServerError { .. } => Some(SERVER_ERROR_RETRY_DELAY),
            DeskError::RequestTimedOut { .. } => Some(TIMEOUT_RETRY_DELAY),
            _ => None,
        }
    }

    /// Sanitizes an error message to remove any occurrence of the API key.
    ///
    /// API keys must never appear in logs, error messages, or output.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to sanitize
    /// * `api_key` - The API key to strip from the message
    ///
    /// # Returns
    ///
    /// The message with any occurrence of the API key replaced with `[REDACTED]`
    #[must_use]
    pub fn sanitize_message(message: &str, api_key: &str) -> String {
        if api_key.is_empty() {
            return message.to_string();
        }
        message.replace(api_key, "[REDACTED]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn parse_error() -> serde_json::Error {
        serde_json::from_str::<serde_json::Value>("{not json").unwrap_err()
    }

    #[test]
    fn test_missing_env_error() {
        let err = DeskError::missing_env("HELPDESK_API_KEY");
        assert!(err.to_string().contains("HELPDESK_API_KEY"));
        assert!(err.to_string().contains("missing"));
        assert_eq!(err.kind(), ErrorCategory::Config);
    }

    #[test]
    fn test_invalid_argument_error() {
        let err = DeskError::invalid_argument("ticket_id must be positive");
        assert_eq!(
            err.to_string(),
            "invalid argument: ticket_id must be positive"
        );
    }

    #[test]
    fn test_decode_error_becomes_response_parse_failed() {
        let err = DeskError::decode(parse_error(), "GET /tickets", "{not json");
        assert_eq!(err.kind(), ErrorCategory::ResponseParseFailed);
        assert!(err.to_string().contains("GET /tickets"));
        assert!(err.to_string().contains("may have changed"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_decode_error_with_marker_becomes_malformed_field() {
        let source = <serde_json::Error as serde::de::Error>::custom(format!(
            "{MALFORMED_FIELD_MARKER}expected an integer, found boolean true"
        ));
        let err = DeskError::decode(source, "GET /tickets", "");
        match err {
            DeskError::MalformedField { message, .. } => {
                assert_eq!(message, "expected an integer, found boolean true");
            }
            other => panic!("expected MalformedField, got {other:?}"),
        }
    }

    #[test]
    fn test_rate_limit_error_exposes_window() {
        let rate_limit = RateLimitInfo {
            limit: 100,
            remaining: 0,
            reset: Utc::now() + TimeDelta::seconds(30),
        };
        let err = DeskError::RateLimitExceeded {
            message: "Rate limit exceeded".to_string(),
            body: ErrorBody::default(),
            rate_limit,
        };
        assert!(err.is_rate_limit());
        assert!(err.is_retryable());
        assert_eq!(err.rate_limit(), Some(rate_limit));
        assert_eq!(err.status(), Some(429));
        let wait = err.retry_after().unwrap();
        assert!(wait > Duration::from_secs(25) && wait <= Duration::from_secs(30));
    }

    #[test]
    fn test_rate_limit_retry_after_none_when_reset_passed() {
        let err = DeskError::RateLimitExceeded {
            message: "Rate limit exceeded".to_string(),
            body: ErrorBody::default(),
            rate_limit: RateLimitInfo::default(),
        };
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_is_retryable_server_errors() {
        let unavailable = DeskError::ServerError {
            status: 503,
            message: "unavailable".to_string(),
            body: ErrorBody::default(),
        };
        assert!(unavailable.is_retryable());
        assert_eq!(unavailable.retry_after(), Some(SERVER_ERROR_RETRY_DELAY));

        let internal = DeskError::ServerError {
            status: 500,
            message: "boom".to_string(),
            body: ErrorBody::default(),
        };
        assert!(internal.is_retryable());
        assert_eq!(internal.message(), "boom");
        assert_eq!(internal.to_string(), "boom (HTTP 500)");
    }

    #[test]
    fn test_is_retryable_not_found() {
        let err = DeskError::NotFound {
            message: "Resource not found".to_string(),
            body: ErrorBody::default(),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_error_body_accessor() {
        let body = ErrorBody {
            message: "Validation failed".to_string(),
            status_code: 400,
            errors: vec![],
        };
        let err = DeskError::ValidationFailed {
            message: body.message.clone(),
            body: body.clone(),
        };
        assert_eq!(err.error_body(), Some(&body));
        assert!(DeskError::invalid_argument("x").error_body().is_none());
    }

    #[test]
    fn test_sanitize_message_removes_api_key() {
        let api_key = "super_secret_key_12345";
        let message = format!("Error connecting with key {} to server", api_key);
        let sanitized = DeskError::sanitize_message(&message, api_key);
        assert!(!sanitized.contains(api_key));
        assert!(sanitized.contains("[REDACTED]"));
    }

    #[test]
    fn test_sanitize_message_empty_key() {
        let message = "Some error message";
        let sanitized = DeskError::sanitize_message(message, "");
        assert_eq!(sanitized, message);
    }
}
