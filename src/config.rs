//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::backoff::DEFAULT_MAX_JITTER;
use crate::breaker::BreakerConfig;
use crate::cache::DEFAULT_MAX_ENTRIES;
use crate::operation::OperationDescriptor;
use crate::retry::RetryPolicy;

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://3.basecampapi.com";

/// Default upper bound on pages fetched by one list call.
pub const DEFAULT_MAX_PAGES: usize = 10_000;

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("bcapi/", env!("CARGO_PKG_VERSION"));

/// Granularity at which circuit breakers are shared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerScope {
    /// One breaker for the whole client.
    Global,
    /// One breaker per API host.
    PerHost,
    /// One breaker per logical service, e.g. `Projects`.
    PerService,
    /// One breaker per `Service.Operation`.
    #[default]
    PerOperation,
}

impl BreakerScope {
    /// Registry key for a call.
    pub fn key(self, op: &OperationDescriptor, url: &Url) -> String {
        match self {
            BreakerScope::Global => "global".to_string(),
            BreakerScope::PerHost => url.host_str().unwrap_or_default().to_string(),
            BreakerScope::PerService => op.service.clone(),
            BreakerScope::PerOperation => op.name(),
        }
    }
}

/// Tunables for a [`BasecampClient`](crate::BasecampClient).
///
/// Immutable after the client is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Serve unchanged GET responses from the ETag cache.
    pub cache_enabled: bool,
    /// ETag cache capacity.
    pub cache_max_entries: usize,
    /// Retry failed GETs and explicitly idempotent writes.
    pub retry_enabled: bool,
    /// Default policy when a request does not bring its own.
    pub retry: RetryPolicy,
    /// Ceiling of the random jitter added to backoff delays.
    pub max_jitter: Duration,
    /// Circuit breaker settings. `None` disables breaking.
    pub breaker: Option<BreakerConfig>,
    pub breaker_scope: BreakerScope,
    /// Page cap for list calls.
    pub max_pages: usize,
    /// Item cap for list calls. `None` means unbounded.
    pub max_items: Option<usize>,
    /// Per-exchange transport timeout.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_max_entries: DEFAULT_MAX_ENTRIES,
            retry_enabled: true,
            retry: RetryPolicy::default(),
            max_jitter: DEFAULT_MAX_JITTER,
            breaker: Some(BreakerConfig::default()),
            breaker_scope: BreakerScope::default(),
            max_pages: DEFAULT_MAX_PAGES,
            max_items: None,
            timeout: Duration::from_secs(30),
            user_agent: USER_AGENT.to_string(),
        }
    }
}
