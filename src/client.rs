//! Basecamp API client.
//!
//! Thin, account-scoped front end over the [`Executor`]. Entity-specific
//! operations are implemented via traits on model types.

use std::env;
use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::auth::{StaticToken, TokenProvider};
use crate::breaker::{BreakerState, Clock, SystemClock};
use crate::cache::EtagCache;
use crate::config::{ClientConfig, DEFAULT_BASE_URL};
use crate::error::{BasecampError, Result};
use crate::executor::{ApiRequest, ApiResponse, CallOptions, Executor};
use crate::hooks::{Hooks, NoopHooks};
use crate::operation::OperationDescriptor;
use crate::pagination::{fetch_all, fetch_page, ListResult, Page, PageLimits};
use crate::security::require_secure_endpoint;
use crate::transport::{ReqwestTransport, Transport};

/// Basecamp API client bound to one account.
///
/// Cheaply cloneable; clones share the connection pool, the ETag cache and
/// the circuit breakers.
///
/// # Example
///
/// ```no_run
/// use bcapi::{BasecampClient, CallOptions, OperationDescriptor};
/// use reqwest::Method;
///
/// # async fn example() -> bcapi::Result<()> {
/// // Create from environment variables
/// let client = BasecampClient::from_env()?;
///
/// // Or configure manually
/// let client = BasecampClient::builder("token", "999999999")
///     .base_url("https://3.basecampapi.com")
///     .build()?;
///
/// let op = OperationDescriptor::new("Projects", "List", Method::GET);
/// let projects = client
///     .get_all::<serde_json::Value>(&op, "projects.json", &CallOptions::default())
///     .await?;
/// println!("{} projects", projects.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BasecampClient {
    exec: Executor,
    base_url: Arc<Url>,
    account_id: Arc<str>,
}

impl std::fmt::Debug for BasecampClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasecampClient")
            .field("base_url", &self.base_url.as_str())
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

impl BasecampClient {
    /// Create a client from environment variables.
    ///
    /// Uses `BASECAMP_ACCESS_TOKEN` and `BASECAMP_ACCOUNT_ID`, and optionally
    /// `BASECAMP_API_URL` (defaults to `https://3.basecampapi.com`).
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is not set.
    pub fn from_env() -> Result<Self> {
        let token = env::var("BASECAMP_ACCESS_TOKEN").map_err(|_| {
            BasecampError::ConfigMissing(
                "BASECAMP_ACCESS_TOKEN environment variable not set".to_string(),
            )
        })?;
        let account_id = env::var("BASECAMP_ACCOUNT_ID").map_err(|_| {
            BasecampError::ConfigMissing(
                "BASECAMP_ACCOUNT_ID environment variable not set".to_string(),
            )
        })?;
        let base_url =
            env::var("BASECAMP_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Self::new(&token, &account_id, &base_url)
    }

    /// Create a client with a static token and default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or not HTTPS.
    pub fn new(token: &str, account_id: &str, base_url: &str) -> Result<Self> {
        Self::builder(token, account_id).base_url(base_url).build()
    }

    /// Start building a client.
    pub fn builder(token: impl Into<String>, account_id: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            tokens: Arc::new(StaticToken::new(token)),
            account_id: account_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            config: ClientConfig::default(),
            transport: None,
            hooks: None,
            clock: None,
        }
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn config(&self) -> &ClientConfig {
        self.exec.config()
    }

    /// The ETag cache, when caching is enabled.
    pub fn cache(&self) -> Option<&EtagCache> {
        self.exec.cache()
    }

    /// State of the breaker guarding `scope`, if it has been used.
    pub fn breaker_state(&self, scope: &str) -> Option<BreakerState> {
        self.exec.breakers().and_then(|b| b.state_of(scope))
    }

    /// Resolve an account-relative path (`projects.json`) or pass an absolute
    /// URL through unchanged.
    pub fn url(&self, path: &str) -> Result<Url> {
        if path.starts_with("https://") || path.starts_with("http://") {
            return Ok(Url::parse(path)?);
        }
        let relative = format!("{}/{}", self.account_id, path.trim_start_matches('/'));
        Ok(self.base_url.join(&relative)?)
    }

    /// Run a fully described request.
    pub async fn execute(
        &self,
        op: &OperationDescriptor,
        request: ApiRequest,
        opts: &CallOptions,
    ) -> Result<ApiResponse> {
        self.exec.execute(op, request, opts).await
    }

    /// GET and decode.
    #[tracing::instrument(skip(self, op, opts), fields(operation = %op.name()))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        op: &OperationDescriptor,
        path: &str,
        opts: &CallOptions,
    ) -> Result<T> {
        let url = self.url(path)?;
        self.exec
            .execute(op, ApiRequest::get(url), opts)
            .await?
            .json()
    }

    /// POST a JSON body and decode the response.
    #[tracing::instrument(skip(self, op, body, opts), fields(operation = %op.name()))]
    pub async fn post<B, T>(
        &self,
        op: &OperationDescriptor,
        path: &str,
        body: &B,
        opts: &CallOptions,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::new(Method::POST, self.url(path)?).json(body)?;
        self.exec.execute(op, request, opts).await?.json()
    }

    /// PUT a JSON body and decode the response.
    #[tracing::instrument(skip(self, op, body, opts), fields(operation = %op.name()))]
    pub async fn put<B, T>(
        &self,
        op: &OperationDescriptor,
        path: &str,
        body: &B,
        opts: &CallOptions,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::new(Method::PUT, self.url(path)?).json(body)?;
        self.exec.execute(op, request, opts).await?.json()
    }

    /// DELETE, ignoring any response body.
    #[tracing::instrument(skip(self, op, opts), fields(operation = %op.name()))]
    pub async fn delete(&self, op: &OperationDescriptor, path: &str, opts: &CallOptions) -> Result<()> {
        let request = ApiRequest::new(Method::DELETE, self.url(path)?);
        self.exec.execute(op, request, opts).await?;
        Ok(())
    }

    /// Fetch a single page of a list endpoint.
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        op: &OperationDescriptor,
        path: &str,
        opts: &CallOptions,
    ) -> Result<Page<T>> {
        fetch_page(&self.exec, op, self.url(path)?, opts).await
    }

    /// Fetch every page of a list endpoint within the client's page and item caps.
    pub async fn get_all<T: DeserializeOwned>(
        &self,
        op: &OperationDescriptor,
        path: &str,
        opts: &CallOptions,
    ) -> Result<ListResult<T>> {
        let limits = PageLimits::from(self.exec.config());
        self.get_all_with(op, path, &limits, opts).await
    }

    /// Fetch every page of a list endpoint within explicit limits.
    pub async fn get_all_with<T: DeserializeOwned>(
        &self,
        op: &OperationDescriptor,
        path: &str,
        limits: &PageLimits,
        opts: &CallOptions,
    ) -> Result<ListResult<T>> {
        fetch_all(&self.exec, op, self.url(path)?, limits, opts).await
    }
}

/// Builder for [`BasecampClient`].
pub struct ClientBuilder {
    tokens: Arc<dyn TokenProvider>,
    account_id: String,
    base_url: String,
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    hooks: Option<Arc<dyn Hooks>>,
    clock: Option<Arc<dyn Clock>>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("account_id", &self.account_id)
            .field("base_url", &self.base_url)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default `reqwest` transport.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the static token with a provider that can rotate or refresh.
    #[must_use]
    pub fn token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = tokens;
        self
    }

    #[must_use]
    pub fn hooks(mut self, hooks: Arc<dyn Hooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Clock used by the circuit breakers.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// # Errors
    ///
    /// Returns an error if the account ID is empty, the base URL is invalid
    /// or not HTTPS, or the HTTP client cannot be built.
    pub fn build(self) -> Result<BasecampClient> {
        let account_id = self.account_id.trim();
        if account_id.is_empty() {
            return Err(BasecampError::ConfigMissing(
                "account ID must not be empty".to_string(),
            ));
        }

        let base_url = if self.base_url.ends_with('/') {
            self.base_url.clone()
        } else {
            format!("{}/", self.base_url)
        };
        let base_url = Url::parse(&base_url)?;
        require_secure_endpoint(&base_url)?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(
                &self.config.user_agent,
                self.config.timeout,
            )?),
        };
        let hooks: Arc<dyn Hooks> = match self.hooks {
            Some(hooks) => hooks,
            None => Arc::new(NoopHooks),
        };
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };

        Ok(BasecampClient {
            exec: Executor::with_clock(transport, self.tokens, hooks, self.config, clock),
            base_url: Arc::new(base_url),
            account_id: Arc::from(account_id),
        })
    }
}
