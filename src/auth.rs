//! Access-token providers.

use async_trait::async_trait;

use crate::error::Result;

/// Supplies bearer tokens for outgoing requests.
///
/// `access_token` is called before the first attempt of a call and again after
/// every retry delay, so providers that rotate tokens are picked up mid-call.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current access token.
    async fn access_token(&self) -> Result<String>;

    /// Force a refresh after the server rejected the token with a 401.
    ///
    /// Returns `Ok(true)` if a new token is now available. The default
    /// provider cannot refresh.
    async fn refresh(&self) -> Result<bool> {
        Ok(false)
    }
}

/// A fixed token, e.g. from `BASECAMP_ACCESS_TOKEN`.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken([REDACTED])")
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token() {
        let provider = StaticToken::new("secret");
        assert_eq!(provider.access_token().await.unwrap(), "secret");
        assert!(!provider.refresh().await.unwrap());
    }

    #[test]
    fn test_static_token_debug_is_redacted() {
        let debug = format!("{:?}", StaticToken::new("secret"));
        assert!(!debug.contains("secret"));
    }
}
