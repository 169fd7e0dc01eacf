//! Token issuance seam to the identity provider.

use async_trait::async_trait;

use mindr_core::{Identity, Result};

/// Issues short-lived identity tokens for authenticating to the backend.
///
/// Implemented against the real identity provider in production; tests use
/// in-memory fakes. Issuance may suspend while the provider round-trips.
/// Failures propagate to the caller; no retry logic lives here.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue_token(&self, identity: &Identity) -> Result<String>;
}

/// Issuer that hands out a fixed, pre-obtained token.
///
/// Used by the composition root when the token was acquired out of band
/// (environment or flag) rather than through a live provider session.
pub struct StaticTokenIssuer {
    token: String,
}

impl StaticTokenIssuer {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenIssuer for StaticTokenIssuer {
    async fn issue_token(&self, _identity: &Identity) -> Result<String> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_issuer_returns_configured_token() {
        let issuer = StaticTokenIssuer::new("id-token-123");
        let identity = Identity {
            uid: "u1".to_string(),
            display_name: "Test".to_string(),
            email: "t@example.com".to_string(),
        };
        assert_eq!(issuer.issue_token(&identity).await.unwrap(), "id-token-123");
    }
}
