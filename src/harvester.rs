//! Orchestration of search, fetch and extraction.
//!
//! The [`OtpHarvester`] is the main entry point for this crate. It provides
//! async methods to:
//!
//! - Fetch the most recent candidate messages from a [`MailSource`]
//! - Turn them into ranked, deduplicated codes
//! - Drop expired and already-used codes
//!
//! # Example
//!
//! ```no_run
//! use mail_otp::{GmailClient, HarvestConfig, OtpHarvester, SharedConsumptionRecord, StaticToken};
//!
//! # async fn example() -> mail_otp::Result<()> {
//! let config = HarvestConfig::builder().build()?;
//! let client = GmailClient::new(&config, StaticToken::new("ya29.access-token"))?;
//! let harvester = OtpHarvester::new(client, config);
//!
//! let consumed = SharedConsumptionRecord::default();
//! for candidate in harvester.fetch_fresh(&consumed).await? {
//!     println!("{candidate}");
//! }
//! # Ok(())
//! # }
//! ```

use crate::candidate::Candidate;
use crate::config::{HarvestConfig, MAX_MESSAGES};
use crate::error::Result;
use crate::extractor::{CodeExtractor, KeywordExtractor};
use crate::freshness::SharedConsumptionRecord;
use crate::payload::RawMessage;
use crate::pipeline;
use crate::source::MailSource;
use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, instrument, warn};

/// Async code harvester over a [`MailSource`].
///
/// Create using [`OtpHarvester::new`].
pub struct OtpHarvester<S> {
    source: S,
    config: HarvestConfig,
    extractor: Box<dyn CodeExtractor>,
}

impl<S: MailSource> OtpHarvester<S> {
    /// Creates a harvester using the keyword extractor described by `config`.
    #[must_use]
    pub fn new(source: S, config: HarvestConfig) -> Self {
        let extractor = KeywordExtractor::from_config(&config.extraction);
        Self {
            source,
            config,
            extractor: Box::new(extractor),
        }
    }

    /// Replaces the code extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: impl CodeExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    /// Returns the configuration in use.
    #[must_use]
    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Returns the underlying mail source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Searches for recent candidate messages and fetches each in full.
    ///
    /// At most `max_messages` messages (never more than [`MAX_MESSAGES`])
    /// are fetched, concurrently. A message
    /// that fails to load is logged and skipped; the rest of the batch is
    /// unaffected.
    ///
    /// # Errors
    ///
    /// Returns an error only if the search itself fails, e.g.
    /// [`Error::Unauthorized`](crate::Error::Unauthorized).
    #[instrument(
        name = "OtpHarvester::fetch_messages",
        skip(self),
        fields(max_messages = self.config.max_messages)
    )]
    pub async fn fetch_messages(&self) -> Result<Vec<RawMessage>> {
        let max_messages = self.config.max_messages.min(MAX_MESSAGES);
        let mut refs = self
            .source
            .search_messages(&self.config.search_query, max_messages)
            .await?;
        refs.truncate(max_messages);

        if refs.is_empty() {
            debug!("No candidate messages");
            return Ok(Vec::new());
        }

        let fetches = refs.iter().map(|r| self.source.get_message(&r.id));
        let results = join_all(fetches).await;

        let mut messages = Vec::with_capacity(results.len());
        for (message_ref, result) in refs.iter().zip(results) {
            match result {
                Ok(message) => messages.push(message),
                Err(e) => warn!(
                    message_id = %message_ref.id,
                    error = %e,
                    category = %e.category(),
                    "Failed to fetch message, skipping"
                ),
            }
        }

        debug!(
            requested = refs.len(),
            fetched = messages.len(),
            "Fetched candidate messages"
        );
        Ok(messages)
    }

    /// Ranked, deduplicated codes from already-fetched `messages`.
    #[must_use]
    pub fn candidates(&self, messages: &[RawMessage]) -> Vec<Candidate> {
        pipeline::extract_candidates(
            messages,
            self.extractor.as_ref(),
            self.config.extraction.max_results,
        )
    }

    /// Fetches recent messages and returns their codes, most recent first.
    ///
    /// An empty list means nothing was found.
    ///
    /// # Errors
    ///
    /// See [`fetch_messages`](Self::fetch_messages).
    #[instrument(name = "OtpHarvester::fetch_candidates", skip(self))]
    pub async fn fetch_candidates(&self) -> Result<Vec<Candidate>> {
        let messages = self.fetch_messages().await?;
        let candidates = self.candidates(&messages);
        debug!(candidate_count = candidates.len(), "Harvested codes");
        Ok(candidates)
    }

    /// Like [`fetch_candidates`](Self::fetch_candidates), keeping only codes
    /// that are not in `consumed` and are younger than the configured TTL.
    ///
    /// # Errors
    ///
    /// See [`fetch_messages`](Self::fetch_messages).
    pub async fn fetch_fresh(&self, consumed: &SharedConsumptionRecord) -> Result<Vec<Candidate>> {
        self.fetch_fresh_at(consumed, Utc::now().timestamp_millis())
            .await
    }

    /// [`fetch_fresh`](Self::fetch_fresh) evaluated at an explicit time.
    ///
    /// # Errors
    ///
    /// See [`fetch_messages`](Self::fetch_messages).
    #[instrument(name = "OtpHarvester::fetch_fresh", skip(self, consumed))]
    pub async fn fetch_fresh_at(
        &self,
        consumed: &SharedConsumptionRecord,
        now_ms: i64,
    ) -> Result<Vec<Candidate>> {
        let candidates = self.fetch_candidates().await?;
        let fresh = consumed
            .filter_fresh(candidates, self.config.ttl, now_ms)
            .await;
        debug!(candidate_count = fresh.len(), "Fresh unconsumed codes");
        Ok(fresh)
    }
}

impl<S> std::fmt::Debug for OtpHarvester<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpHarvester")
            .field("config", &self.config)
            .field("extractor", &self.extractor.description())
            .finish_non_exhaustive()
    }
}
