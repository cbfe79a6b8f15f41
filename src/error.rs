//! Error types for the SPGCI API client.
//!
//! Every failure surfaced by the client maps onto one [`Error`] variant.
//! The three API-specific kinds mirror how the remote service signals
//! trouble: rejected credentials ([`Error::Authentication`]), the
//! per-second throttle ([`Error::PerSecondLimit`]) and the exhausted daily
//! quota ([`Error::DailyLimit`]).

use reqwest::header::HeaderMap;
use thiserror::Error;

/// Response header carrying the number of requests still allowed today.
pub const RATE_LIMIT_REMAINING_DAY: &str = "x-ratelimit-remaining-day";

/// A specialized `Result` type for SPGCI operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for all SPGCI API operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport failed (connection, TLS, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an unexpected non-200 response
    #[error("API error: status={status}, message={message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Human-readable error message
        message: String,
        /// Raw response body for diagnostics
        body: String,
    },

    /// Invalid username/password, or the token was rejected (400/401/403)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Too many requests per second (429 with daily quota remaining)
    #[error("Per second rate limit reached")]
    PerSecondLimit,

    /// Daily request quota exhausted (429 with no daily quota remaining)
    #[error("Daily rate limit reached")]
    DailyLimit,

    /// A response could not be decoded into rows or pagination metadata
    #[error("Decode error: {0}")]
    Decode(String),

    /// Invalid input provided to a function
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` if this error is transient and the request may be
    /// retried after a short wait.
    ///
    /// # Example
    ///
    /// ```
    /// use spgci_rs::Error;
    ///
    /// assert!(Error::PerSecondLimit.is_retryable());
    /// assert!(!Error::DailyLimit.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::PerSecondLimit)
    }

    /// Returns `true` if this is an authentication-related error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Authentication(_))
    }

    /// Returns `true` if the API rejected the request for rate limiting.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::PerSecondLimit | Error::DailyLimit)
    }

    /// Returns `true` if this error indicates a client-side issue.
    pub fn is_client_error(&self) -> bool {
        match self {
            Error::Api { status, .. } => *status >= 400 && *status < 500,
            Error::InvalidInput(_) | Error::Config(_) | Error::Authentication(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if this error indicates a server-side issue.
    pub fn is_server_error(&self) -> bool {
        match self {
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Classify a 429 response using the remaining daily quota header.
    ///
    /// A missing or unparsable header counts as zero remaining requests.
    pub(crate) fn from_rate_limit(headers: &HeaderMap) -> Self {
        let remaining = headers
            .get(RATE_LIMIT_REMAINING_DAY)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(0);

        if remaining > 0 {
            Error::PerSecondLimit
        } else {
            Error::DailyLimit
        }
    }

    /// Create an API error from a response body.
    pub(crate) fn from_api_response(status: u16, body: String) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("error").and_then(|e| e.get("message")))
                    .or_else(|| v.get("error"))
                    .and_then(|m| m.as_str())
                    .map(String::from)
            })
            .unwrap_or_else(|| "Unknown API error".to_string());

        Error::Api {
            status,
            message,
            body,
        }
    }
}
