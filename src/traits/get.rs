//! Get trait for fetching single entities.

use async_trait::async_trait;

use crate::client::BasecampClient;
use crate::error::Result;

/// Fetch a single entity by ID.
///
/// Implementations issue a `GET` on the entity's account-scoped URL, so a
/// repeated fetch is revalidated with `If-None-Match` and a `304` is answered
/// from the client's ETag cache. Reads are retried on network errors and on
/// the retry policy's statuses.
///
/// # Example
///
/// ```ignore
/// use bcapi::{BasecampClient, Project, Get};
///
/// let client = BasecampClient::from_env()?;
/// let project = Project::get(&client, 2085958499).await?;
/// ```
#[async_trait]
pub trait Get: Sized {
    /// The ID type for this entity (Basecamp uses numeric IDs).
    type Id;

    /// Fetch the entity by ID.
    ///
    /// # Arguments
    ///
    /// * `client` - The Basecamp client, already bound to an account
    /// * `id` - The entity identifier
    ///
    /// # Errors
    ///
    /// Returns `Api` with status 404 if the entity does not exist, `Auth` if
    /// the token is rejected, or `CircuitOpen` if the operation's breaker is
    /// open.
    async fn get(client: &BasecampClient, id: Self::Id) -> Result<Self>;
}
