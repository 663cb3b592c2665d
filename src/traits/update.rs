//! Update trait for modifying entities.

use async_trait::async_trait;

use crate::client::BasecampClient;
use crate::error::Result;

/// Update an existing entity.
///
/// Updates are `PUT` requests and are sent once: a failed write is never
/// replayed unless the implementation marks the request idempotent. A
/// successful update drops the entity's cached ETag.
///
/// # Example
///
/// ```ignore
/// use bcapi::{BasecampClient, Project, ProjectUpdateParams, Update};
///
/// let client = BasecampClient::from_env()?;
/// let updated = Project::update(
///     &client,
///     2085958499,
///     ProjectUpdateParams {
///         name: Some("New Name".to_string()),
///         ..Default::default()
///     },
/// ).await?;
/// ```
#[async_trait]
pub trait Update: Sized {
    /// The ID type for this entity.
    type Id;

    /// Fields to change. Unset fields are left untouched on the server.
    type Params;

    /// Update the entity and return the version the server stored.
    ///
    /// # Arguments
    ///
    /// * `client` - The Basecamp client, already bound to an account
    /// * `id` - The entity identifier
    /// * `params` - Fields to change
    ///
    /// # Errors
    ///
    /// Returns `Api` with status 404 if the entity does not exist, or 422 if
    /// the server rejects the new values.
    async fn update(client: &BasecampClient, id: Self::Id, params: Self::Params) -> Result<Self>;
}
