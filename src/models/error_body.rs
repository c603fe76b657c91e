//! Error payloads returned by the helpdesk API.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::decode::{flexible_int, lenient_string};

/// Structured error returned by the API on non-success responses.
///
/// Wire shape:
///
/// ```json
/// {"message": "...", "statusCode": 400,
///  "errors": [{"field": "email", "errorMessage": "...", "errorType": "InvalidValue"}]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Top-level error message.
    pub message: String,

    /// HTTP status code the error was returned with.
    pub status_code: u16,

    /// Per-field errors, in server order.
    pub errors: Vec<FieldError>,
}

/// A single field-level error.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct FieldError {
    /// Name of the offending field; empty for errors not tied to a field.
    #[serde(default, deserialize_with = "lenient_string")]
    pub field: String,

    /// Description of the problem.
    #[serde(
        default,
        rename = "errorMessage",
        alias = "message",
        deserialize_with = "lenient_string"
    )]
    pub message: String,

    /// Machine-readable error tag.
    #[serde(default, rename = "errorType", alias = "errorKind")]
    pub kind: ErrorKind,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawErrorBody {
    #[serde(default, deserialize_with = "lenient_string")]
    message: String,
    #[serde(default, deserialize_with = "flexible_int")]
    status_code: Option<i64>,
    #[serde(default)]
    errors: Option<Vec<FieldError>>,
}

impl<'de> Deserialize<'de> for ErrorBody {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawErrorBody::deserialize(deserializer)?;
        Ok(ErrorBody {
            message: raw.message,
            status_code: raw
                .status_code
                .and_then(|code| u16::try_from(code).ok())
                .unwrap_or(0),
            errors: raw.errors.unwrap_or_default(),
        })
    }
}

impl ErrorBody {
    /// Builds the body used when the server sent no parseable error payload.
    ///
    /// The raw response text becomes both the top-level message and the
    /// message of a single field-less `UnknownError` entry.
    pub fn synthesize(status_code: u16, raw_body: &str) -> Self {
        Self {
            message: raw_body.to_string(),
            status_code,
            errors: vec![FieldError {
                field: String::new(),
                message: raw_body.to_string(),
                kind: ErrorKind::UnknownError,
            }],
        }
    }

    /// Returns the errors reported for `field`.
    pub fn errors_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldError> + 'a {
        self.errors.iter().filter(move |e| e.field == field)
    }
}

/// Error tag reported by the API.
///
/// The server may introduce new tags at any time; unknown values are kept
/// verbatim in [`ErrorKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ErrorKind {
    /// The referenced record does not exist.
    NotFound,
    /// The API key was missing or rejected.
    Unauthorized,
    /// The API key lacks permission for the operation.
    AccessDenied,
    /// A field value was rejected.
    InvalidValue,
    /// The API call quota for the current window is used up.
    ApiCallQuotaExceeded,
    /// The server did not say.
    #[default]
    UnknownError,
    /// Any tag not listed above.
    Other(String),
}

impl ErrorKind {
    /// The wire tag for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::AccessDenied => "AccessDenied",
            ErrorKind::InvalidValue => "InvalidValue",
            ErrorKind::ApiCallQuotaExceeded => "APICallQuotaExceeded",
            ErrorKind::UnknownError => "UnknownError",
            ErrorKind::Other(tag) => tag,
        }
    }
}

impl From<&str> for ErrorKind {
    fn from(tag: &str) -> Self {
        match tag {
            "NotFound" => ErrorKind::NotFound,
            "Unauthorized" => ErrorKind::Unauthorized,
            "AccessDenied" => ErrorKind::AccessDenied,
            "InvalidValue" => ErrorKind::InvalidValue,
            "APICallQuotaExceeded" => ErrorKind::ApiCallQuotaExceeded,
            "" | "UnknownError" => ErrorKind::UnknownError,
            other => ErrorKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tag = lenient_string(deserializer)?;
        Ok(ErrorKind::from(tag.as_str()))
    }
}
