//! Request executor.
//!
//! Runs one logical call end to end: endpoint validation, circuit breaker,
//! token acquisition, ETag revalidation, the attempt loop with backoff, and
//! hook emission. A logical call fires exactly one operation start/end pair;
//! each physical attempt fires one request start/end pair.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, ETAG, IF_NONE_MATCH,
};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::auth::TokenProvider;
use crate::backoff::retry_delay;
use crate::breaker::{BreakerRegistry, Clock, SystemClock};
use crate::cache::EtagCache;
use crate::config::ClientConfig;
use crate::error::{BasecampError, Result};
use crate::hooks::Hooks;
use crate::operation::{OperationDescriptor, OperationResult, RequestInfo, RequestResult};
use crate::retry::RetryPolicy;
use crate::security::{redact_headers, require_secure_endpoint};
use crate::transport::{Transport, TransportRequest, TransportResponse};

const JSON: &str = "application/json";

/// A request to run through the executor.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    retry: Option<RetryPolicy>,
    idempotent: bool,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            retry: None,
            idempotent: false,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Serialize `body` as the JSON payload.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(Bytes::from(serde_json::to_vec(body)?));
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
        Ok(self)
    }

    /// Raw payload; the caller sets `Content-Type` if it is not JSON.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Override the client's retry policy for this request.
    #[must_use]
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Mark a write as safe to repeat, making it eligible for retries.
    #[must_use]
    pub fn idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    fn retries_allowed(&self) -> bool {
        self.is_get() || self.idempotent
    }
}

/// Per-call cancellation and deadline.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Wall-clock budget covering every attempt and every backoff sleep.
    pub deadline: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl CallOptions {
    #[must_use]
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// A successful response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Served from the ETag cache after a 304.
    pub from_cache: bool,
}

impl ApiResponse {
    /// Decode the body. An empty body (e.g. 204) decodes as JSON `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.is_empty() {
            return Ok(serde_json::from_slice(b"null")?);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// A response header as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Shared engine behind a client. Cheap to clone.
#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenProvider>,
    cache: Option<Arc<EtagCache>>,
    breakers: Option<Arc<BreakerRegistry>>,
    hooks: Arc<dyn Hooks>,
    config: Arc<ClientConfig>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("transport", &self.transport)
            .field("cache_entries", &self.cache.as_ref().map(|c| c.len()))
            .field("breaker_scopes", &self.breakers.as_ref().map(|b| b.len()))
            .finish_non_exhaustive()
    }
}

impl Executor {
    pub fn new(
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenProvider>,
        hooks: Arc<dyn Hooks>,
        config: ClientConfig,
    ) -> Self {
        Self::with_clock(transport, tokens, hooks, config, Arc::new(SystemClock))
    }

    /// Like [`Executor::new`], with breakers reading time from `clock`.
    pub fn with_clock(
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenProvider>,
        hooks: Arc<dyn Hooks>,
        config: ClientConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = config
            .cache_enabled
            .then(|| Arc::new(EtagCache::new(config.cache_max_entries)));
        let breakers = config
            .breaker
            .clone()
            .map(|c| Arc::new(BreakerRegistry::with_clock(c, clock)));
        Self {
            transport,
            tokens,
            cache,
            breakers,
            hooks,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&EtagCache> {
        self.cache.as_deref()
    }

    pub fn breakers(&self) -> Option<&BreakerRegistry> {
        self.breakers.as_deref()
    }

    pub(crate) fn hooks(&self) -> &dyn Hooks {
        self.hooks.as_ref()
    }

    /// Run one logical call.
    #[tracing::instrument(skip_all, fields(operation = %op.name(), method = %request.method))]
    pub async fn execute(
        &self,
        op: &OperationDescriptor,
        request: ApiRequest,
        opts: &CallOptions,
    ) -> Result<ApiResponse> {
        let started = Instant::now();
        self.hooks.on_operation_start(op);

        let result = self.call(op, request, opts).await;

        let error = result.as_ref().err();
        self.hooks.on_operation_end(
            op,
            &OperationResult {
                status: match &result {
                    Ok(resp) => Some(resp.status.as_u16()),
                    Err(err) => err.status(),
                },
                duration: started.elapsed(),
                error,
            },
        );
        result
    }

    /// Breaker-guarded attempt loop under the caller's deadline and cancel
    /// token, without operation hooks.
    ///
    /// An expired deadline is recorded as a breaker failure; a cancelled call
    /// is not recorded at all.
    pub(crate) async fn call(
        &self,
        op: &OperationDescriptor,
        request: ApiRequest,
        opts: &CallOptions,
    ) -> Result<ApiResponse> {
        require_secure_endpoint(&request.url)?;

        let breaker = match &self.breakers {
            Some(registry) => {
                let scope = self.config.breaker_scope.key(op, &request.url);
                let breaker = registry.get(&scope);
                if !breaker.allow() {
                    tracing::debug!(%scope, "circuit open, rejecting call");
                    return Err(BasecampError::CircuitOpen { scope });
                }
                Some(breaker)
            }
            None => None,
        };

        let result = guard(opts, self.run(&request)).await;

        if let Some(breaker) = breaker {
            match &result {
                Ok(_) => breaker.record_success(),
                Err(err) if err.counts_against_breaker() => breaker.record_failure(),
                Err(_) => {}
            }
        }

        if result.is_ok() && !request.is_get() {
            if let Some(cache) = &self.cache {
                cache.invalidate(request.url.as_str());
            }
        }
        result
    }

    async fn run(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let policy = request.retry.as_ref().unwrap_or(&self.config.retry);
        let max_attempts = if self.config.retry_enabled && request.retries_allowed() {
            policy.attempts()
        } else {
            1
        };

        let mut token = self.access_token().await?;
        let mut refreshed = false;
        let mut attempt = 1;

        loop {
            let info = RequestInfo {
                method: request.method.clone(),
                url: request.url.clone(),
                attempt,
            };
            self.hooks.on_request_start(&info);
            let started = Instant::now();
            let outcome = self.attempt(request, &token).await;
            let duration = started.elapsed();

            let err = match outcome {
                Ok(response) => {
                    self.hooks.on_request_end(
                        &info,
                        &RequestResult {
                            status: Some(response.status.as_u16()),
                            duration,
                            bytes: response.body.len(),
                            from_cache: response.from_cache,
                            error: None,
                            will_retry: false,
                        },
                    );
                    return Ok(response);
                }
                Err(err) => err,
            };

            // A rejected token gets one refresh and an immediate replay,
            // outside the retry budget and regardless of method.
            if err.status() == Some(401) && !refreshed {
                refreshed = true;
                let refreshed_token = match self.tokens.refresh().await {
                    Ok(done) => done,
                    Err(refresh_err) => {
                        tracing::debug!(error = %refresh_err, "token refresh failed after 401");
                        false
                    }
                };
                if refreshed_token {
                    self.end_failed_attempt(&info, &err, duration, true);
                    token = self.access_token().await?;
                    continue;
                }
            }

            let will_retry = attempt < max_attempts && should_retry(&err, policy);
            self.end_failed_attempt(&info, &err, duration, will_retry);
            if !will_retry {
                return Err(err);
            }

            let delay = retry_delay(
                attempt,
                policy.base_delay,
                policy.strategy,
                self.config.max_jitter,
                err.status(),
                err.retry_after(),
            );
            self.hooks.on_retry(&info, attempt + 1, &err, delay);
            tokio::time::sleep(delay).await;

            token = self.access_token().await?;
            attempt += 1;
        }
    }

    fn end_failed_attempt(
        &self,
        info: &RequestInfo,
        err: &BasecampError,
        duration: Duration,
        will_retry: bool,
    ) {
        self.hooks.on_request_end(
            info,
            &RequestResult {
                status: err.status(),
                duration,
                bytes: 0,
                from_cache: false,
                error: Some(err),
                will_retry,
            },
        );
    }

    async fn access_token(&self) -> Result<String> {
        match self.tokens.access_token().await {
            Ok(token) => Ok(token),
            Err(err @ BasecampError::Auth { .. }) => Err(err),
            Err(err) => Err(BasecampError::auth(format!("failed to obtain access token: {err}"))),
        }
    }

    /// One physical exchange, mapped to a response or a classified error.
    async fn attempt(&self, request: &ApiRequest, token: &str) -> Result<ApiResponse> {
        let cache = if request.is_get() {
            self.cache.as_deref()
        } else {
            None
        };
        let key = request.url.as_str();

        let mut headers = request.headers.clone();
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| BasecampError::auth("access token is not a valid header value"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static(JSON));

        let etag = cache.and_then(|c| c.get(key));
        if let Some(value) = etag.as_deref().and_then(|e| HeaderValue::from_str(e).ok()) {
            headers.insert(IF_NONE_MATCH, value);
        }

        tracing::trace!(
            method = %request.method,
            headers = ?redact_headers(&headers),
            "sending request"
        );

        let TransportResponse {
            status,
            headers,
            body,
        } = self
            .transport
            .send(TransportRequest {
                method: request.method.clone(),
                url: request.url.clone(),
                headers,
                body: request.body.clone(),
            })
            .await?;

        if status == StatusCode::NOT_MODIFIED {
            if let Some(cached) = etag.and(cache).and_then(|c| c.get_body(key)) {
                return Ok(ApiResponse {
                    status: StatusCode::OK,
                    headers,
                    body: cached,
                    from_cache: true,
                });
            }
            return Err(BasecampError::from_response(status, &headers, &body));
        }

        if !status.is_success() {
            return Err(BasecampError::from_response(status, &headers, &body));
        }

        if let Some(cache) = cache {
            if status == StatusCode::OK {
                if let Some(tag) = headers.get(ETAG).and_then(|v| v.to_str().ok()) {
                    cache.store(key, body.clone(), tag);
                }
            }
        }

        Ok(ApiResponse {
            status,
            headers,
            body,
            from_cache: false,
        })
    }
}

fn should_retry(err: &BasecampError, policy: &RetryPolicy) -> bool {
    match err {
        BasecampError::Network { .. } => true,
        other => other
            .status()
            .is_some_and(|status| policy.should_retry_status(status)),
    }
}

/// Apply the caller's cancellation token and deadline to `fut`.
///
/// Cancellation wins over completion when both are ready.
async fn guard<T, F>(opts: &CallOptions, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let cancellable = async {
        match &opts.cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => Err(BasecampError::Cancelled),
                result = fut => result,
            },
            None => fut.await,
        }
    };

    match opts.deadline {
        Some(limit) => tokio::time::timeout(limit, cancellable)
            .await
            .unwrap_or(Err(BasecampError::Timeout(limit))),
        None => cancellable.await,
    }
}
