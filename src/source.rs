//! The mail provider boundary.
//!
//! The harvester only needs two calls from a provider: a relevance search
//! that returns message ids, and a detail fetch per id. [`GmailClient`]
//! implements them over HTTPS; tests and other backends implement
//! [`MailSource`] directly.
//!
//! [`GmailClient`]: crate::GmailClient

use crate::error::Result;
use crate::payload::RawMessage;
use async_trait::async_trait;

/// Reference to a message returned by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    /// Provider-assigned message id.
    pub id: String,
}

impl MessageRef {
    /// Creates a reference to message `id`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// A provider of recent email.
///
/// Implementations report rejected credentials as
/// [`Error::Unauthorized`](crate::Error::Unauthorized) so callers can
/// re-authenticate.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Returns up to `max_results` messages matching `query`, newest first.
    async fn search_messages(&self, query: &str, max_results: usize) -> Result<Vec<MessageRef>>;

    /// Fetches the full message (headers, body tree, timestamp, snippet).
    async fn get_message(&self, id: &str) -> Result<RawMessage>;
}
