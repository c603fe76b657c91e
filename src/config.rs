//! Configuration management for the desklink client.
//!
//! This module handles loading configuration from environment variables,
//! with validation to ensure all required values are present.

use std::env;
use std::time::Duration;

use crate::error::DeskError;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for connecting to the helpdesk API.
///
/// The API key is stored but never logged or exposed in error messages.
#[derive(Clone)]
pub struct Config {
    /// Base URL of the helpdesk (e.g., `https://acme.helpdesk.example`).
    pub base_url: String,

    /// API key sent in the `x-api-key` header.
    /// This value must never be logged or included in error messages.
    pub api_key: String,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    /// Creates a validated configuration with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns `DeskError::Config` if the base URL has no http(s) scheme or
    /// the API key is empty or a placeholder.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, DeskError> {
        let base_url = Self::validate_base_url(base_url.into())?;
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(DeskError::invalid_config("API key must not be empty"));
        }
        Self::validate_api_key(&api_key)?;

        Ok(Config {
            base_url,
            api_key,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Replaces the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// # Required Environment Variables
    ///
    /// - `HELPDESK_BASE_URL`: The base URL of the helpdesk
    /// - `HELPDESK_API_KEY`: The API key for authentication
    ///
    /// # Optional Environment Variables
    ///
    /// - `HELPDESK_TIMEOUT_SECS`: Request timeout in seconds (default 30)
    ///
    /// # Errors
    ///
    /// Returns `DeskError::Config` if any required variable is missing
    /// or if values fail validation.
    ///
    /// # Example
    ///
    /// ```ignore
    /// dotenvy::dotenv().ok();
    /// let config = Config::from_env()?;
    /// ```
    pub fn from_env() -> Result<Self, DeskError> {
        let base_url = Self::get_required_env("HELPDESK_BASE_URL")?;
        let api_key = Self::get_required_env("HELPDESK_API_KEY")?;
        let timeout = match env::var("HELPDESK_TIMEOUT_SECS") {
            Ok(raw) => Self::parse_timeout(&raw)?,
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self::new(base_url, api_key)?.with_timeout(timeout))
    }

    /// Gets a required environment variable, returning an error if missing or empty.
    fn get_required_env(name: &str) -> Result<String, DeskError> {
        env::var(name)
            .map_err(|_| DeskError::missing_env(name))
            .and_then(|value| {
                if value.trim().is_empty() {
                    Err(DeskError::missing_env(name))
                } else {
                    Ok(value)
                }
            })
    }

    /// Parses a positive number of seconds.
    fn parse_timeout(raw: &str) -> Result<Duration, DeskError> {
        match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(DeskError::invalid_config(
                "HELPDESK_TIMEOUT_SECS must be a positive number of seconds",
            )),
        }
    }

    /// Validates and normalizes the base URL.
    fn validate_base_url(url: String) -> Result<String, DeskError> {
        let url = url.trim().trim_end_matches('/').to_string();

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(DeskError::invalid_config(
                "HELPDESK_BASE_URL must start with http:// or https://",
            ));
        }

        url::Url::parse(&url).map_err(|e| {
            DeskError::invalid_config(format!("HELPDESK_BASE_URL is not a valid URL: {e}"))
        })?;

        Ok(url)
    }

    /// Validates the API key is not a placeholder value.
    fn validate_api_key(key: &str) -> Result<(), DeskError> {
        let key_lower = key.to_lowercase();
        let placeholder_patterns = [
            "your_api_key",
            "your-api-key",
            "your_key",
            "placeholder",
            "changeme",
        ];

        for pattern in placeholder_patterns {
            if key_lower.contains(pattern) {
                return Err(DeskError::invalid_config(
                    "HELPDESK_API_KEY appears to be a placeholder value",
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: Tests that modify environment variables should not run in parallel,
    // so these only exercise the validation helpers.

    #[test]
    fn test_validate_base_url_removes_trailing_slash() {
        let result = Config::validate_base_url("https://example.com/".to_string()).unwrap();
        assert_eq!(result, "https://example.com");
    }

    #[test]
    fn test_validate_base_url_requires_scheme() {
        let result = Config::validate_base_url("example.com".to_string());
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_api_key_rejects_placeholder() {
        let result = Config::validate_api_key("your_api_key_here");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_api_key_accepts_real_key() {
        let result = Config::validate_api_key("abc123def456");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(Config::parse_timeout("15").unwrap(), Duration::from_secs(15));
        assert!(Config::parse_timeout("0").is_err());
        assert!(Config::parse_timeout("soon").is_err());
    }

    #[test]
    fn test_new_rejects_empty_key() {
        assert!(Config::new("https://example.com", "  ").is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config::new("https://example.com", "abc123def456").unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("abc123def456"));
        assert!(debug.contains("[REDACTED]"));
    }
}
