//! Raw HTTP exchange abstraction.
//!
//! The executor only ever talks to a [`Transport`]; the default
//! [`ReqwestTransport`] wraps a pooled `reqwest::Client`, and tests swap in
//! scripted implementations.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use url::Url;

use crate::error::{BasecampError, Result};
use crate::security::body_limit;

/// One physical request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// One physical response, fully buffered up to [`body_limit`].
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Performs a single HTTP exchange.
///
/// Implementations return `Err` only for transport-level failures
/// (connection, DNS, TLS, per-exchange timeout); every HTTP status,
/// including 4xx and 5xx, is an `Ok` response.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}

/// [`Transport`] backed by `reqwest`.
///
/// Cheaply cloneable; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    /// Build a transport with compression enabled and a per-exchange timeout.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(user_agent)
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self { http })
    }

    /// Wrap an existing client.
    pub fn from_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let mut builder = self
            .http
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let mut response = builder.send().await.map_err(BasecampError::from)?;
        let status = response.status();
        let headers = response.headers().clone();
        let limit = body_limit(status);

        if status.is_success() && response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(body_too_large(limit));
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(BasecampError::from)? {
            if append_capped(&mut body, &chunk, limit) {
                if status.is_success() {
                    return Err(body_too_large(limit));
                }
                tracing::debug!(%status, limit, "error body truncated");
                break;
            }
        }

        Ok(TransportResponse {
            status,
            headers,
            body: body.freeze(),
        })
    }
}

fn body_too_large(limit: usize) -> BasecampError {
    BasecampError::network(format!("response body exceeds {limit} bytes"))
}

/// Append `chunk` without letting `buf` grow past `limit`. Returns `true`
/// when part of the chunk had to be dropped.
fn append_capped(buf: &mut BytesMut, chunk: &[u8], limit: usize) -> bool {
    let room = limit.saturating_sub(buf.len());
    if chunk.len() > room {
        buf.extend_from_slice(&chunk[..room]);
        return true;
    }
    buf.extend_from_slice(chunk);
    false
}
