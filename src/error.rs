//! Error types for Basecamp API operations.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use thiserror::Error;

use crate::backoff::parse_retry_after;
use crate::security::{truncate_message, MAX_ERROR_MESSAGE_BYTES};

/// Boxed error used as the source of transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during Basecamp API operations.
#[derive(Debug, Error)]
pub enum BasecampError {
    /// Configuration is missing or incomplete.
    #[error("Basecamp configuration required: {0}")]
    ConfigMissing(String),

    /// Malformed caller input. Never reaches the network.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Connection, DNS, TLS or per-exchange timeout failure.
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The deadline spanning all attempts of a call expired.
    #[error("Request deadline of {0:?} exceeded")]
    Timeout(Duration),

    /// The caller cancelled the call.
    #[error("Request cancelled")]
    Cancelled,

    /// The circuit breaker for the call's scope rejected the call.
    #[error("Circuit breaker is open for scope '{scope}'")]
    CircuitOpen { scope: String },

    /// Rate limited (HTTP 429).
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Token acquisition failed or the server answered 401.
    #[error("Authentication failed: {message}")]
    Auth {
        message: String,
        status: Option<u16>,
    },

    /// Any other non-2xx response.
    #[error("Basecamp API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// A pagination `Link` header pointed at another origin.
    #[error("Pagination Link header points to a different origin: {found} (expected {expected})")]
    PaginationOriginMismatch { expected: String, found: String },

    /// JSON parsing error.
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Machine-readable classification of a [`BasecampError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Timeout,
    Cancelled,
    CircuitOpen,
    RateLimit,
    Auth,
    Validation,
    NotFound,
    Forbidden,
    Api,
    PaginationOrigin,
    Config,
    Parse,
}

impl ErrorKind {
    /// Stable string code for logs and CLI output.
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::CircuitOpen => "circuit_open",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Auth => "auth_required",
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Api => "api_error",
            ErrorKind::PaginationOrigin => "pagination_origin",
            ErrorKind::Config => "config",
            ErrorKind::Parse => "parse",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BasecampError {
    /// Create a network error from a message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create an authentication error that did not come from an HTTP response.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
            status: None,
        }
    }

    /// The machine-readable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigMissing(_) => ErrorKind::Config,
            Self::Validation(_) | Self::Url(_) => ErrorKind::Validation,
            Self::Network { .. } => ErrorKind::Network,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Api { status: 404, .. } => ErrorKind::NotFound,
            Self::Api { status: 403, .. } => ErrorKind::Forbidden,
            Self::Api { .. } => ErrorKind::Api,
            Self::PaginationOriginMismatch { .. } => ErrorKind::PaginationOrigin,
            Self::Parse(_) => ErrorKind::Parse,
        }
    }

    /// The HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::Auth { status, .. } => *status,
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether retrying the call later might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Server-supplied delay hint for rate-limited calls.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Whether this terminal outcome is reported to the circuit breaker as a failure.
    ///
    /// Errors raised before any exchange (validation, open circuit) and caller
    /// cancellation say nothing about the upstream's health.
    pub(crate) fn counts_against_breaker(&self) -> bool {
        !matches!(
            self,
            Self::Cancelled
                | Self::CircuitOpen { .. }
                | Self::Validation(_)
                | Self::Url(_)
                | Self::ConfigMissing(_)
        )
    }

    /// Convert a non-success HTTP response into an error.
    pub(crate) fn from_response(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Self {
        match status.as_u16() {
            401 => Self::Auth {
                message: "Authentication failed".to_string(),
                status: Some(401),
            },
            429 => Self::RateLimited {
                retry_after: parse_retry_after(headers),
            },
            code => Self::Api {
                status: code,
                message: extract_error_message(status, body),
            },
        }
    }
}

impl From<reqwest::Error> for BasecampError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            "connection failed".to_string()
        } else {
            err.to_string()
        };
        Self::Network {
            message,
            source: Some(Box::new(err)),
        }
    }
}

/// Extract an error message from a failed response body.
fn extract_error_message(status: StatusCode, body: &[u8]) -> String {
    if body.is_empty() {
        return format!("Request failed (HTTP {})", status.as_u16());
    }

    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(body) {
        if let Some(msg) = json.get("error").and_then(|m| m.as_str()) {
            return truncate_message(msg, MAX_ERROR_MESSAGE_BYTES);
        }
        if let Some(msg) = json.get("message").and_then(|m| m.as_str()) {
            return truncate_message(msg, MAX_ERROR_MESSAGE_BYTES);
        }
        return format!("Request failed (HTTP {})", status.as_u16());
    }

    truncate_message(&String::from_utf8_lossy(body), MAX_ERROR_MESSAGE_BYTES)
}

/// Result type alias for Basecamp operations.
pub type Result<T> = core::result::Result<T, BasecampError>;
