//! Access token boundary.
//!
//! The transport asks a [`TokenProvider`] for a bearer token before each
//! call and tells it when the provider rejected one. Token acquisition,
//! caching and refresh live entirely behind this trait.

use crate::error::{Error, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::atomic::{AtomicBool, Ordering};

/// Source of OAuth bearer tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a token to use for the next request.
    ///
    /// Return [`Error::AuthCanceled`] if the user declined to sign in.
    async fn token(&self) -> Result<SecretString>;

    /// Called with a token the mail provider rejected, before asking for a new one.
    async fn invalidate(&self, token: &SecretString);
}

/// A fixed token, e.g. one minted by an external OAuth flow.
///
/// Once invalidated it is not handed out again: later requests fail with
/// [`Error::Unauthorized`] until a new provider is supplied.
pub struct StaticToken {
    token: SecretString,
    revoked: AtomicBool,
}

impl StaticToken {
    /// Wraps `token`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            revoked: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<SecretString> {
        if self.revoked.load(Ordering::Acquire) {
            return Err(Error::Unauthorized { status: 401 });
        }
        Ok(self.token.clone())
    }

    async fn invalidate(&self, token: &SecretString) {
        if token.expose_secret() == self.token.expose_secret() {
            self.revoked.store(true, Ordering::Release);
        }
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticToken")
            .field("token", &"[REDACTED]")
            .field("revoked", &self.revoked.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token_until_invalidated() {
        let provider = StaticToken::new("ya29.token");
        let token = provider.token().await.unwrap();
        assert_eq!(token.expose_secret(), "ya29.token");

        provider.invalidate(&SecretString::from("other".to_string())).await;
        assert!(provider.token().await.is_ok());

        provider.invalidate(&token).await;
        let err = provider.token().await.unwrap_err();
        assert!(err.requires_reauth());
    }

    #[test]
    fn test_token_not_in_debug() {
        let provider = StaticToken::new("ya29.secret-token");
        assert!(!format!("{provider:?}").contains("secret-token"));
    }
}
