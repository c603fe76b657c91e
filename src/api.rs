//! HTTP access to the helpdesk REST API.
//!
//! This module provides `ApiClient`, which issues authenticated GET
//! requests, records the rate limit window of every response, classifies
//! failures and decodes list pages.
//!
//! # Retries
//!
//! The client does not retry. Rate limit errors and server errors are
//! returned as-is; see [`DeskError::is_retryable`] and
//! [`DeskError::retry_after`] for caller-side policies.
//!
//! # Security
//!
//! The API key is never logged. All error bodies are sanitized before they
//! are stored or logged.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::classify::classify;
use crate::config::Config;
use crate::decode::DecodeOptions;
use crate::error::DeskError;
use crate::models::{ListEnvelope, Page};
use crate::query::ListQuery;
use crate::rate_limit::{RateLimitInfo, RateLimitTracker};

/// Path prefix of every endpoint.
pub const API_BASE_PATH: &str = "/api/v1.0";

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-api-key";

/// The Accept header value.
const ACCEPT_JSON: &str = "application/json";

/// Maximum length kept of non-JSON error bodies, to avoid storing whole HTML pages.
const MAX_ERROR_BODY_LEN: usize = 500;

/// HTTP client for the helpdesk API.
///
/// Cloning is cheap and clones share the connection pool and the rate limit
/// tracker. Use [`ApiClient::fork`] for a clone with its own tracker.
///
/// # Example
///
/// ```ignore
/// let config = Config::from_env()?;
/// let api = ApiClient::new(&config)?;
///
/// let page: Page<Ticket> = api.fetch_page("/tickets", &TicketQuery::new()).await?;
/// ```
#[derive(Clone)]
pub struct ApiClient {
    /// The underlying HTTP client (cloning is cheap).
    http: Client,

    /// Base URL including the API path (e.g., `https://acme.example/api/v1.0`).
    base_url: String,

    /// API key for authentication.
    /// SECURITY: Never log this value!
    api_key: String,

    /// Timeout applied to every request, reported in timeout errors.
    timeout: Duration,

    /// Decode configuration for response bodies.
    decode: DecodeOptions,

    /// Latest rate limit window seen by this client.
    rate_limit: RateLimitTracker,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("decode", &self.decode)
            .finish()
    }
}

impl ApiClient {
    /// Creates a new API client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `DeskError::HttpClient` if the HTTP client fails to initialize.
    pub fn new(config: &Config) -> Result<Self, DeskError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(DeskError::HttpClient)?;

        Ok(Self::with_http_client(http, config))
    }

    /// Creates an API client on top of an existing `reqwest::Client`, sharing
    /// its connection pool.
    ///
    /// The client's own timeout settings apply; `config.timeout` is only
    /// used in error reports.
    pub fn with_http_client(http: Client, config: &Config) -> Self {
        Self {
            http,
            base_url: Self::normalize_base_url(&config.base_url),
            api_key: config.api_key.clone(),
            timeout: config.timeout,
            decode: DecodeOptions::default(),
            rate_limit: RateLimitTracker::new(),
        }
    }

    /// Replaces the decode configuration.
    pub fn with_decode_options(mut self, options: DecodeOptions) -> Self {
        self.decode = options;
        self
    }

    /// Returns a clone that shares the transport but tracks its own rate limit window.
    pub fn fork(&self) -> Self {
        Self {
            rate_limit: RateLimitTracker::new(),
            ..self.clone()
        }
    }

    /// Normalizes the base URL to ensure it includes the API path.
    fn normalize_base_url(url: &str) -> String {
        let url = url.trim_end_matches('/');
        if url.ends_with(API_BASE_PATH) {
            url.to_string()
        } else if url.ends_with("/api") {
            format!("{}/v1.0", url)
        } else {
            format!("{}{}", url, API_BASE_PATH)
        }
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The decode configuration in use.
    pub fn decode_options(&self) -> &DecodeOptions {
        &self.decode
    }

    /// The latest rate limit window seen by this client.
    pub fn rate_limit(&self) -> RateLimitInfo {
        self.rate_limit.snapshot()
    }

    /// The tracker holding this client's rate limit window.
    pub fn rate_limit_tracker(&self) -> &RateLimitTracker {
        &self.rate_limit
    }

    /// Validates that an entity id is positive before it is put in a URL.
    ///
    /// # Errors
    ///
    /// Returns `DeskError::InvalidArgument` for zero or negative ids.
    pub fn validate_id(id: i64, field_name: &str) -> Result<(), DeskError> {
        if id <= 0 {
            return Err(DeskError::invalid_argument(format!(
                "{} must be a positive integer, got: {}",
                field_name, id
            )));
        }
        Ok(())
    }

    /// Issues one GET and returns the body of a successful response.
    ///
    /// Every response, successful or not, updates the rate limit window.
    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String, DeskError> {
        let url = format!("{}{}", self.base_url, path);
        let operation = format!("GET {}", path);

        tracing::debug!(path = %path, params = ?query, "Making helpdesk API request");

        let response = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::ACCEPT, ACCEPT_JSON)
            .query(query)
            .send()
            .await
            .map_err(|e| DeskError::transport(e, operation.as_str(), self.timeout))?;

        let status = response.status();
        let rate_limit = self.rate_limit.observe(response.headers());

        let body = response
            .text()
            .await
            .map_err(|e| DeskError::transport(e, operation.as_str(), self.timeout))?;

        if !status.is_success() {
            return Err(self.handle_http_error(status, &body, rate_limit));
        }

        tracing::trace!(body = %body, "Helpdesk API response");

        Ok(body)
    }

    /// Converts a non-success response into a `DeskError`.
    fn handle_http_error(&self, status: StatusCode, body: &str, rate_limit: RateLimitInfo) -> DeskError {
        // Sanitize the body to ensure no API key leakage
        let body = DeskError::sanitize_message(body, &self.api_key);
        let body = if body.len() > MAX_ERROR_BODY_LEN && !body.trim_start().starts_with('{') {
            let cut = (0..=MAX_ERROR_BODY_LEN)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            format!("{}...[truncated]", &body[..cut])
        } else {
            body
        };

        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(
                remaining = rate_limit.remaining,
                reset = %rate_limit.reset,
                "Rate limited by helpdesk API"
            );
        } else if status.is_server_error() {
            tracing::warn!(status = %status, "Helpdesk API server error");
        } else {
            tracing::debug!(status = %status, "Helpdesk API request failed");
        }

        classify(status, &body, rate_limit, &self.decode)
    }

    /// Fetches one page of a list endpoint.
    ///
    /// An empty body yields an empty page. The body may be the
    /// `{result, count}` envelope or a bare JSON array.
    ///
    /// # Errors
    ///
    /// - API failures as classified by [`classify`]
    /// - `NetworkFailure` / `RequestTimedOut` for transport failures
    /// - `ResponseParseFailed` / `MalformedField` for undecodable bodies
    pub async fn fetch_page<T, Q>(&self, path: &str, query: &Q) -> Result<Page<T>, DeskError>
    where
        T: DeserializeOwned,
        Q: ListQuery,
    {
        let body = self.get_text(path, &query.to_query_pairs()).await?;
        self.decode_page(&body, &format!("GET {}", path))
    }

    /// Fetches a single entity.
    ///
    /// # Errors
    ///
    /// As [`ApiClient::fetch_page`]; an empty body is a `ResponseParseFailed`.
    pub async fn fetch_one<T>(&self, path: &str) -> Result<T, DeskError>
    where
        T: DeserializeOwned,
    {
        let body = self.get_text(path, &[]).await?;
        let operation = format!("GET {}", path);
        let value = self.parse_json(&body, &operation)?;

        // Single-fetch endpoints sometimes wrap the entity like list endpoints.
        let value = match value {
            Value::Object(mut map) if map.len() == 1 && map.get("result").is_some_and(Value::is_object) => {
                map.remove("result").unwrap_or(Value::Null)
            }
            other => other,
        };

        self.decode
            .decode(value)
            .map_err(|e| DeskError::decode(e, operation, self.decode.preview(&body)))
    }

    /// Decodes a list body into a page.
    pub(crate) fn decode_page<T>(&self, body: &str, operation: &str) -> Result<Page<T>, DeskError>
    where
        T: DeserializeOwned,
    {
        if body.trim().is_empty() {
            return Ok(Page::empty());
        }

        let value = self.parse_json(body, operation)?;
        let decoded = match value {
            Value::Array(items) => self
                .decode
                .decode::<Vec<T>>(Value::Array(items))
                .map(|items| Page::new(items, 0)),
            other => self.decode.decode::<ListEnvelope<T>>(other).map(Page::from),
        };

        decoded.map_err(|e| DeskError::decode(e, operation, self.decode.preview(body)))
    }

    fn parse_json(&self, body: &str, operation: &str) -> Result<Value, DeskError> {
        serde_json::from_str(body)
            .map_err(|e| DeskError::decode(e, operation, self.decode.preview(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::models::Ticket;

    /// Creates an ApiClient for unit tests without requiring Config/env vars.
    fn test_client() -> ApiClient {
        ApiClient {
            http: Client::new(),
            base_url: "https://example.com/api/v1.0".to_string(),
            api_key: "test_key".to_string(),
            timeout: Duration::from_secs(1),
            decode: DecodeOptions::default(),
            rate_limit: RateLimitTracker::new(),
        }
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            ApiClient::normalize_base_url("https://example.com"),
            "https://example.com/api/v1.0"
        );
        assert_eq!(
            ApiClient::normalize_base_url("https://example.com/"),
            "https://example.com/api/v1.0"
        );
        assert_eq!(
            ApiClient::normalize_base_url("https://example.com/api/v1.0/"),
            "https://example.com/api/v1.0"
        );
        assert_eq!(
            ApiClient::normalize_base_url("https://example.com/api"),
            "https://example.com/api/v1.0"
        );
    }

    #[test]
    fn test_validate_id() {
        assert!(ApiClient::validate_id(1, "ticket_id").is_ok());
        let err = ApiClient::validate_id(0, "ticket_id").unwrap_err();
        assert!(err.to_string().contains("ticket_id"));
        assert!(ApiClient::validate_id(-5, "ticket_id").is_err());
    }

    #[test]
    fn test_decode_page_envelope() {
        let page: Page<Ticket> = test_client()
            .decode_page(r#"{"result": [{"id": 1}, {"id": 2}], "count": 40}"#, "GET /tickets")
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page.total_count, 40);
        assert_eq!(page.items[1].id.get(), Some(2));
    }

    #[test]
    fn test_decode_page_bare_array() {
        let page: Page<Ticket> = test_client()
            .decode_page(r#"[{"id": 5}]"#, "GET /brands")
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.total_count, 0);
    }

    #[test]
    fn test_decode_page_empty_body() {
        let page: Page<Ticket> = test_client().decode_page("  ", "GET /tickets").unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn test_decode_page_pascal_case_envelope() {
        let page: Page<Ticket> = test_client()
            .decode_page(r#"{"Result": [{"ID": 9, "Subject": "Hi"}], "Count": 1}"#, "GET /tickets")
            .unwrap();
        assert_eq!(page.items[0].id.get(), Some(9));
        assert_eq!(page.items[0].subject.as_deref(), Some("Hi"));
    }

    #[test]
    fn test_decode_page_invalid_json() {
        let err = test_client()
            .decode_page::<Ticket>("<html>", "GET /tickets")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorCategory::ResponseParseFailed);
    }

    #[test]
    fn test_decode_page_wrong_shape() {
        let err = test_client()
            .decode_page::<Ticket>(r#"{"result": 5}"#, "GET /tickets")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorCategory::ResponseParseFailed);
        assert!(err.to_string().contains("may have changed"));
    }

    #[test]
    fn test_decode_page_malformed_field() {
        let err = test_client()
            .decode_page::<Ticket>(r#"{"result": [{"id": 1, "agentId": true}]}"#, "GET /tickets")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorCategory::MalformedField);
    }

    #[test]
    fn test_fork_has_own_tracker() {
        let client = test_client();
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            crate::rate_limit::REMAINING_HEADER,
            reqwest::header::HeaderValue::from_static("7"),
        );
        client.rate_limit_tracker().observe(&headers);

        assert_eq!(client.clone().rate_limit().remaining, 7);
        assert_eq!(client.fork().rate_limit().remaining, 0);
    }

    #[test]
    fn test_error_body_is_sanitized() {
        let client = test_client();
        let err = client.handle_http_error(
            StatusCode::BAD_GATEWAY,
            "proxy rejected key test_key",
            RateLimitInfo::default(),
        );
        let body = err.error_body().unwrap();
        assert!(!body.message.contains("test_key"));
        assert!(body.message.contains("[REDACTED]"));
    }
}
