//! List trait for fetching collections of entities.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::Url;

use crate::client::BasecampClient;
use crate::error::Result;
use crate::executor::CallOptions;
use crate::operation::OperationDescriptor;
use crate::pagination::{ListResult, Page, PageLimits};

/// List entities from a `Link`-paginated endpoint.
///
/// Implementors describe the endpoint; paging, limits and the same-origin
/// check on `Link` targets come from the provided methods.
///
/// # Example
///
/// ```ignore
/// use bcapi::{BasecampClient, List, PageLimits, Project};
///
/// let client = BasecampClient::from_env()?;
///
/// // Fetch the first page
/// let page = Project::list_page(&client, &Default::default()).await?;
///
/// // Fetch up to 50 projects across pages
/// let limits = PageLimits::default().max_items(50);
/// let projects = Project::list_all(&client, &Default::default(), &limits).await?;
/// ```
#[async_trait]
pub trait List: DeserializeOwned + Send {
    /// Query parameters for filtering.
    type Query: Default + Send + Sync;

    /// Descriptor reported to hooks and used for breaker scoping.
    fn list_operation(query: &Self::Query) -> OperationDescriptor;

    /// URL of the first page.
    fn list_url(client: &BasecampClient, query: &Self::Query) -> Result<Url>;

    /// Fetch the first page only.
    async fn list_page(client: &BasecampClient, query: &Self::Query) -> Result<Page<Self>> {
        let op = Self::list_operation(query);
        let url = Self::list_url(client, query)?;
        client
            .get_page(&op, url.as_str(), &CallOptions::default())
            .await
    }

    /// Follow `Link` headers until the last page or a limit.
    ///
    /// # Errors
    ///
    /// Returns an error if a page request fails (unless `limits.allow_partial`
    /// is set and at least one page arrived) or a `Link` points off-origin.
    async fn list_all(
        client: &BasecampClient,
        query: &Self::Query,
        limits: &PageLimits,
    ) -> Result<ListResult<Self>> {
        let op = Self::list_operation(query);
        let url = Self::list_url(client, query)?;
        client
            .get_all_with(&op, url.as_str(), limits, &CallOptions::default())
            .await
    }
}
