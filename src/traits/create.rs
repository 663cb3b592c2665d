//! Create trait for adding entities.

use async_trait::async_trait;

use crate::client::BasecampClient;
use crate::error::Result;

/// Create a new entity.
///
/// Creation is never retried automatically; a failed create may or may not
/// have taken effect on the server.
#[async_trait]
pub trait Create: Sized {
    /// Parameters for the new entity.
    type Params;

    /// Create the entity and return it as stored by the server.
    async fn create(client: &BasecampClient, params: Self::Params) -> Result<Self>;
}
