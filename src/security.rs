//! URL and header hygiene.

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use url::{Host, Url};

use crate::error::{BasecampError, Result};

/// Maximum length of a server-supplied message carried in an error.
pub const MAX_ERROR_MESSAGE_BYTES: usize = 500;

/// Largest successful response body the client will buffer (50 MiB).
pub const MAX_RESPONSE_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Error bodies are read up to this size (1 MiB); the rest is discarded.
pub const MAX_ERROR_BODY_BYTES: usize = 1024 * 1024;

const SENSITIVE_HEADERS: [&str; 4] = ["authorization", "cookie", "set-cookie", "x-csrf-token"];

/// Require `https`, except for loopback and `localhost` hosts.
pub fn require_secure_endpoint(url: &Url) -> Result<()> {
    match url.scheme() {
        "https" => Ok(()),
        "http" if is_localhost(url) => Ok(()),
        "http" => Err(BasecampError::Validation(format!(
            "URL must use HTTPS: {url}"
        ))),
        other => Err(BasecampError::Validation(format!(
            "unsupported URL scheme '{other}': {url}"
        ))),
    }
}

/// Whether the URL points at the local machine (RFC 6761 `.localhost` included).
pub fn is_localhost(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain == "localhost" || domain.ends_with(".localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

/// Scheme, host and port equality, with default ports normalised.
pub fn is_same_origin(a: &Url, b: &Url) -> bool {
    a.scheme().eq_ignore_ascii_case(b.scheme())
        && a.host_str().is_some()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

/// Buffering cap for a response body with `status`.
pub fn body_limit(status: StatusCode) -> usize {
    if status.is_success() || status == StatusCode::NOT_MODIFIED {
        MAX_RESPONSE_BODY_BYTES
    } else {
        MAX_ERROR_BODY_BYTES
    }
}

/// Copy of `headers` with credentials replaced by `[REDACTED]`.
pub fn redact_headers(headers: &HeaderMap) -> HeaderMap {
    let mut redacted = headers.clone();
    for name in SENSITIVE_HEADERS {
        if redacted.contains_key(name) {
            redacted.insert(name, HeaderValue::from_static("[REDACTED]"));
        }
    }
    redacted
}

/// Truncate to at most `max_len` bytes on a char boundary, appending `...`.
pub fn truncate_message(message: &str, max_len: usize) -> String {
    if message.len() <= max_len {
        return message.to_string();
    }
    if max_len <= 3 {
        return floor_boundary(message, max_len).to_string();
    }
    format!("{}...", floor_boundary(message, max_len - 3))
}

fn floor_boundary(s: &str, max: usize) -> &str {
    let mut end = max.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_require_secure_endpoint() {
        assert!(require_secure_endpoint(&url("https://3.basecampapi.com/1/projects.json")).is_ok());
        assert!(require_secure_endpoint(&url("http://localhost:3000/x")).is_ok());
        assert!(require_secure_endpoint(&url("http://127.0.0.1:8080/x")).is_ok());
        assert!(require_secure_endpoint(&url("http://app.localhost/x")).is_ok());
        assert!(require_secure_endpoint(&url("http://[::1]:9000/x")).is_ok());
        assert!(require_secure_endpoint(&url("http://3.basecampapi.com/x")).is_err());
        assert!(require_secure_endpoint(&url("ftp://localhost/x")).is_err());
    }

    #[test]
    fn test_body_limit_by_status() {
        assert_eq!(body_limit(StatusCode::OK), MAX_RESPONSE_BODY_BYTES);
        assert_eq!(body_limit(StatusCode::NO_CONTENT), MAX_RESPONSE_BODY_BYTES);
        assert_eq!(body_limit(StatusCode::NOT_FOUND), MAX_ERROR_BODY_BYTES);
        assert_eq!(body_limit(StatusCode::SERVICE_UNAVAILABLE), MAX_ERROR_BODY_BYTES);
        assert!(MAX_ERROR_BODY_BYTES < MAX_RESPONSE_BODY_BYTES);
    }

    #[test]
    fn test_same_origin_normalises_default_ports() {
        assert!(is_same_origin(
            &url("https://3.basecampapi.com/1/projects.json"),
            &url("https://3.basecampapi.com:443/1/projects.json?page=2"),
        ));
        assert!(is_same_origin(
            &url("http://127.0.0.1:4000/a"),
            &url("http://127.0.0.1:4000/b"),
        ));
    }

    #[test]
    fn test_same_origin_rejects_differences() {
        let base = url("https://3.basecampapi.com/1/projects.json");
        assert!(!is_same_origin(&base, &url("https://evil.example.com/1/projects.json")));
        assert!(!is_same_origin(&base, &url("http://3.basecampapi.com/1/projects.json")));
        assert!(!is_same_origin(&base, &url("https://3.basecampapi.com:8443/1/projects.json")));
    }

    #[test]
    fn test_redact_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer secret"));
        headers.insert("accept", HeaderValue::from_static("application/json"));

        let redacted = redact_headers(&headers);
        assert_eq!(redacted["authorization"], "[REDACTED]");
        assert_eq!(redacted["accept"], "application/json");
    }

    #[test]
    fn test_truncate_message() {
        assert_eq!(truncate_message("short", 10), "short");
        assert_eq!(truncate_message("abcdefghij", 8), "abcde...");
        assert_eq!(truncate_message("abcdef", 2), "ab");
        // multi-byte characters are never split
        let truncated = truncate_message("ééééé", 6);
        assert_eq!(truncated, "é...");
    }
}
