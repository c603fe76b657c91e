//! Maps failed responses to [`DeskError`] variants.
//!
//! The server usually explains a failure with an [`ErrorBody`] payload, but
//! gateways and older endpoints may return nothing, plain text or HTML. In
//! that case a body is synthesized from the raw text, and the error message
//! falls back to a fixed default for the status code.

use reqwest::StatusCode;

use crate::decode::DecodeOptions;
use crate::error::DeskError;
use crate::models::ErrorBody;
use crate::rate_limit::RateLimitInfo;

/// Default message for HTTP 401.
pub const AUTHENTICATION_FAILED_MESSAGE: &str =
    "Authentication failed. Please verify your API key.";

/// Default message for HTTP 403.
pub const ACCESS_DENIED_MESSAGE: &str =
    "Access denied. Your API key does not have permission to perform this operation.";

/// Default message for HTTP 400.
pub const VALIDATION_FAILED_MESSAGE: &str = "Validation failed";

/// Default message for HTTP 429.
pub const RATE_LIMIT_EXCEEDED_MESSAGE: &str = "Rate limit exceeded";

/// Default message for HTTP 404.
pub const NOT_FOUND_MESSAGE: &str = "Resource not found";

/// Default message for HTTP 405.
pub const METHOD_NOT_ALLOWED_MESSAGE: &str = "Method not allowed";

/// Default message for HTTP 415.
pub const UNSUPPORTED_MEDIA_TYPE_MESSAGE: &str = "Unsupported media type";

/// Default message for HTTP 500, 502, 503 and 504.
pub const SERVER_ERROR_MESSAGE: &str = "Unable to process your request. Please try again later";

/// The error body of a failed response, and whether the server supplied it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedErrorBody {
    /// Decoded from the server's JSON payload.
    Server(ErrorBody),
    /// Built locally because the payload was absent or not an error object.
    Synthetic(ErrorBody),
}

impl ParsedErrorBody {
    /// Decodes `raw_body` as an [`ErrorBody`], synthesizing one on failure.
    ///
    /// An object with neither a message nor field errors (`{"error": "..."}`)
    /// is not an error body and is synthesized too, keeping the raw text. A
    /// decoded body that omits `statusCode` gets the response status.
    pub fn parse(status: StatusCode, raw_body: &str, options: &DecodeOptions) -> Self {
        let decoded = serde_json::from_str::<serde_json::Value>(raw_body)
            .ok()
            .filter(serde_json::Value::is_object)
            .and_then(|value| options.decode::<ErrorBody>(value).ok())
            .filter(|body| !body.message.trim().is_empty() || !body.errors.is_empty());

        match decoded {
            Some(mut body) => {
                if body.status_code == 0 {
                    body.status_code = status.as_u16();
                }
                ParsedErrorBody::Server(body)
            }
            None => ParsedErrorBody::Synthetic(ErrorBody::synthesize(status.as_u16(), raw_body)),
        }
    }

    /// The server's message when it sent a non-empty one, else `default`.
    fn message_or(&self, default: impl Into<String>) -> String {
        match self {
            ParsedErrorBody::Server(body) if !body.message.trim().is_empty() => body.message.clone(),
            _ => default.into(),
        }
    }

    fn into_body(self) -> ErrorBody {
        match self {
            ParsedErrorBody::Server(body) | ParsedErrorBody::Synthetic(body) => body,
        }
    }
}

/// Converts a non-success response into the matching [`DeskError`].
///
/// `rate_limit` is the window observed on the same response and is carried
/// by `RateLimitExceeded`.
pub fn classify(
    status: StatusCode,
    raw_body: &str,
    rate_limit: RateLimitInfo,
    options: &DecodeOptions,
) -> DeskError {
    let parsed = ParsedErrorBody::parse(status, raw_body, options);
    let code = status.as_u16();

    match code {
        401 => DeskError::AuthenticationFailed {
            message: parsed.message_or(AUTHENTICATION_FAILED_MESSAGE),
            body: parsed.into_body(),
        },
        403 => DeskError::AccessDenied {
            message: parsed.message_or(ACCESS_DENIED_MESSAGE),
            body: parsed.into_body(),
        },
        400 => DeskError::ValidationFailed {
            message: parsed.message_or(VALIDATION_FAILED_MESSAGE),
            body: parsed.into_body(),
        },
        429 => DeskError::RateLimitExceeded {
            message: parsed.message_or(RATE_LIMIT_EXCEEDED_MESSAGE),
            body: parsed.into_body(),
            rate_limit,
        },
        404 => DeskError::NotFound {
            message: parsed.message_or(NOT_FOUND_MESSAGE),
            body: parsed.into_body(),
        },
        405 => DeskError::MethodNotAllowed {
            message: parsed.message_or(METHOD_NOT_ALLOWED_MESSAGE),
            body: parsed.into_body(),
        },
        415 => DeskError::UnsupportedMediaType {
            message: parsed.message_or(UNSUPPORTED_MEDIA_TYPE_MESSAGE),
            body: parsed.into_body(),
        },
        500 | 502 | 503 | 504 => DeskError::ServerError {
            status: code,
            message: parsed.message_or(SERVER_ERROR_MESSAGE),
            body: parsed.into_body(),
        },
        _ => DeskError::GenericApiFailure {
            status: code,
            message: parsed.message_or(format!("API request failed with status {code}")),
            body: parsed.into_body(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::models::ErrorKind;
    use pretty_assertions::assert_eq;

    fn run(code: u16, body: &str) -> DeskError {
        classify(
            StatusCode::from_u16(code).unwrap(),
            body,
            RateLimitInfo::default(),
            &DecodeOptions::default(),
        )
    }

    #[test]
    fn test_empty_body_table() {
        let cases: [(u16, ErrorCategory, &str); 12] = [
            (400, ErrorCategory::ValidationFailed, VALIDATION_FAILED_MESSAGE),
            (401, ErrorCategory::AuthenticationFailed, AUTHENTICATION_FAILED_MESSAGE),
            (403, ErrorCategory::AccessDenied, ACCESS_DENIED_MESSAGE),
            (404, ErrorCategory::NotFound, NOT_FOUND_MESSAGE),
            (405, ErrorCategory::MethodNotAllowed, METHOD_NOT_ALLOWED_MESSAGE),
            (415, ErrorCategory::UnsupportedMediaType, UNSUPPORTED_MEDIA_TYPE_MESSAGE),
            (429, ErrorCategory::RateLimitExceeded, RATE_LIMIT_EXCEEDED_MESSAGE),
            (500, ErrorCategory::ServerError, SERVER_ERROR_MESSAGE),
            (502, ErrorCategory::ServerError, SERVER_ERROR_MESSAGE),
            (503, ErrorCategory::ServerError, SERVER_ERROR_MESSAGE),
            (504, ErrorCategory::ServerError, SERVER_ERROR_MESSAGE),
            (418, ErrorCategory::GenericApiFailure, "API request failed with status 418"),
        ];

        for (code, kind, message) in cases {
            let err = run(code, "");
            assert_eq!(err.kind(), kind, "status {code}");
            let display = err.to_string();
            assert!(display.starts_with(message), "status {code}: {display}");
            assert_eq!(err.status(), Some(code));
        }
    }

    #[test]
    fn test_server_message_wins() {
        let err = run(
            404,
            r#"{"message": "Ticket 12 does not exist", "statusCode": 404, "errors": []}"#,
        );
        assert_eq!(err.to_string(), "Ticket 12 does not exist");
    }

    #[test]
    fn test_generic_failure_uses_server_message() {
        let err = run(409, r#"{"message": "Conflict on update"}"#);
        assert_eq!(err.kind(), ErrorCategory::GenericApiFailure);
        assert_eq!(err.to_string(), "Conflict on update");
        assert_eq!(err.error_body().unwrap().status_code, 409);
    }

    #[test]
    fn test_validation_failed_exposes_field_errors() {
        let err = run(
            400,
            r#"{"message": "", "statusCode": 400, "errors": [
                {"field": "email", "errorMessage": "Invalid email", "errorType": "InvalidValue"}
            ]}"#,
        );
        assert_eq!(err.to_string(), VALIDATION_FAILED_MESSAGE);
        let body = err.error_body().unwrap();
        assert_eq!(body.errors.len(), 1);
        assert_eq!(body.errors[0].field, "email");
        assert_eq!(body.errors[0].kind, ErrorKind::InvalidValue);
    }

    #[test]
    fn test_unparseable_body_is_synthesized() {
        let err = run(502, "<html>Bad Gateway</html>");
        assert_eq!(err.to_string(), format!("{SERVER_ERROR_MESSAGE} (HTTP 502)"));
        let body = err.error_body().unwrap();
        assert_eq!(body.message, "<html>Bad Gateway</html>");
        assert_eq!(body.status_code, 502);
        assert_eq!(body.errors[0].kind, ErrorKind::UnknownError);
        assert_eq!(body.errors[0].message, "<html>Bad Gateway</html>");
    }

    #[test]
    fn test_non_object_json_is_synthesized() {
        let parsed = ParsedErrorBody::parse(
            StatusCode::BAD_REQUEST,
            r#""just a string""#,
            &DecodeOptions::default(),
        );
        assert!(matches!(parsed, ParsedErrorBody::Synthetic(_)));
    }

    #[test]
    fn test_foreign_object_keeps_raw_text() {
        let err = run(401, r#"{"error":"bad key"}"#);
        assert_eq!(err.kind(), ErrorCategory::AuthenticationFailed);
        assert_eq!(err.to_string(), AUTHENTICATION_FAILED_MESSAGE);
        let body = err.error_body().unwrap();
        assert_eq!(body.message, r#"{"error":"bad key"}"#);
        assert_eq!(body.status_code, 401);
        assert_eq!(body.errors[0].kind, ErrorKind::UnknownError);
    }

    #[test]
    fn test_rate_limit_info_is_carried() {
        let info = RateLimitInfo {
            limit: 100,
            remaining: 0,
            reset: chrono::Utc::now(),
        };
        let err = classify(
            StatusCode::TOO_MANY_REQUESTS,
            "",
            info,
            &DecodeOptions::default(),
        );
        assert_eq!(err.rate_limit(), Some(info));
    }
}
