//! Basecamp API client library.
//!
//! A resilient request engine for the Basecamp 3 REST API: ETag revalidation,
//! retries with backoff, per-scope circuit breakers, `Link`-header pagination
//! with a same-origin guard, and lifecycle hooks for observability. Entity
//! operations (Get, List, Create, Update) are traits that model types
//! implement.
//!
//! # Quick Start
//!
//! ```no_run
//! use bcapi::{BasecampClient, Get, List, PageLimits, Project};
//!
//! #[tokio::main]
//! async fn main() -> bcapi::Result<()> {
//!     // Create client from environment variables
//!     let client = BasecampClient::from_env()?;
//!
//!     // Get a project by ID
//!     let project = Project::get(&client, 2085958499).await?;
//!     println!("Project: {}", project.name);
//!
//!     // List projects, following Link headers
//!     let limits = PageLimits::default().max_items(100);
//!     let projects = Project::list_all(&client, &Default::default(), &limits).await?;
//!     println!("Found {} projects (truncated: {})", projects.len(), projects.truncated);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Request lifecycle
//!
//! Every call runs through the [`Executor`]:
//!
//! 1. HTTPS check (plain HTTP is only allowed for localhost)
//! 2. circuit breaker for the call's [`BreakerScope`]
//! 3. bearer token from the [`TokenProvider`]
//! 4. attempts with `If-None-Match` on cached GETs, retried on network
//!    errors and on the [`RetryPolicy`] statuses (GET or idempotent writes only)
//! 5. outcome reported to the breaker and to [`Hooks`]
//!
//! A call-wide deadline and a cancellation token can be passed in
//! [`CallOptions`].
//!
//! # Configuration
//!
//! The client reads configuration from environment variables:
//!
//! - `BASECAMP_ACCESS_TOKEN` (required) - OAuth access token
//! - `BASECAMP_ACCOUNT_ID` (required) - Account the client is bound to
//! - `BASECAMP_API_URL` (optional) - Base URL (defaults to `https://3.basecampapi.com`)

pub mod auth;
pub mod backoff;
pub mod breaker;
pub mod cache;
pub mod cli;
mod client;
pub mod config;
mod error;
pub mod executor;
pub mod hooks;
mod models;
pub mod operation;
pub mod output;
mod pagination;
pub mod retry;
pub mod security;
mod traits;
pub mod transport;

#[cfg(feature = "test-server")]
pub mod mock_server;

// Re-export core types
pub use auth::{StaticToken, TokenProvider};
pub use backoff::BackoffStrategy;
pub use breaker::{BreakerConfig, BreakerRegistry, BreakerState, CircuitBreaker, Clock, ManualClock};
pub use cache::EtagCache;
pub use client::{BasecampClient, ClientBuilder};
pub use config::{BreakerScope, ClientConfig};
pub use error::{BasecampError, ErrorKind, Result};
pub use executor::{ApiRequest, ApiResponse, CallOptions, Executor};
pub use hooks::{ChainHooks, Hooks, NoopHooks, TracingHooks};
pub use operation::{OperationDescriptor, OperationResult, RequestInfo, RequestResult};
pub use pagination::{parse_next_link, parse_total_count, ListResult, Page, PageLimits};
pub use retry::RetryPolicy;
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};

// Re-export traits
pub use traits::{Create, Get, List, Update};

// Re-export models
pub use models::{
    Project, ProjectCreateParams, ProjectListQuery, ProjectStatus, ProjectUpdateParams,
};

pub use tokio_util::sync::CancellationToken;
