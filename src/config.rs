//! Configuration for the code harvester.
//!
//! Use [`HarvestConfigBuilder`] to create a configuration with sensible defaults:
//!
//! ```
//! use mail_otp::HarvestConfig;
//! use std::time::Duration;
//!
//! let config = HarvestConfig::builder()
//!     .ttl(Duration::from_secs(300))
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.max_messages, 15);
//! assert_eq!(config.extraction.max_results, 10);
//! ```

use crate::error::{Error, Result};
use crate::proxy::Socks5Proxy;
use std::time::Duration;
use url::Url;

/// Default REST API origin.
pub const DEFAULT_API_BASE: &str = "https://gmail.googleapis.com";

/// Default relevance query: unread mail from the last hour mentioning a code.
pub const DEFAULT_SEARCH_QUERY: &str = "is:unread newer_than:1h (OTP OR \"one-time password\" \
     OR \"verification code\" OR passcode OR code OR \"security code\" OR \"login code\" \
     OR \"verification number\")";

/// Upper bound on messages fetched per harvest.
pub const MAX_MESSAGES: usize = 15;

/// Upper bound on codes returned per harvest.
pub const MAX_RESULTS: usize = 10;

/// Keywords searched by the extractor, in order.
pub const DEFAULT_KEYWORDS: [&str; 5] = [
    "otp",
    "one-time password",
    "verification code",
    "passcode",
    "code",
];

/// Configuration for searching mail and extracting codes.
///
/// Create using [`HarvestConfig::builder()`].
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Origin of the mail REST API.
    pub api_base: Url,
    /// Relevance query passed to the provider's search.
    pub search_query: String,
    /// Maximum number of messages fetched per harvest, never more than [`MAX_MESSAGES`].
    pub max_messages: usize,
    /// How long a code stays fresh after its message arrived.
    pub ttl: Duration,
    /// Extraction and ranking settings.
    pub extraction: ExtractionConfig,
    /// Transport timeouts.
    pub timeouts: TimeoutConfig,
    /// Optional SOCKS5 proxy for API requests.
    pub proxy: Option<Socks5Proxy>,
}

impl HarvestConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> HarvestConfigBuilder {
        HarvestConfigBuilder::default()
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            search_query: DEFAULT_SEARCH_QUERY.to_string(),
            max_messages: MAX_MESSAGES,
            ttl: Duration::from_secs(10 * 60),
            extraction: ExtractionConfig::default(),
            timeouts: TimeoutConfig::default(),
            proxy: None,
        }
    }
}

fn default_api_base() -> Url {
    Url::parse(DEFAULT_API_BASE).expect("default API base is a valid URL")
}

/// Settings for turning message text into ranked codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionConfig {
    /// ASCII-lowercase keywords that mark the neighborhood of a code.
    pub keywords: Vec<String>,
    /// Characters scanned on each side of a keyword.
    pub window: usize,
    /// Maximum number of codes returned, never more than [`MAX_RESULTS`].
    pub max_results: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(ToString::to_string).collect(),
            window: 80,
            max_results: MAX_RESULTS,
        }
    }
}

/// Timeout configuration for API calls.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Timeout for the message search call.
    pub search: Duration,
    /// Timeout for each message detail call.
    pub message_fetch: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            search: Duration::from_secs(10),
            message_fetch: Duration::from_secs(15),
        }
    }
}

/// Builder for [`HarvestConfig`].
#[derive(Debug, Default)]
pub struct HarvestConfigBuilder {
    api_base: Option<String>,
    search_query: Option<String>,
    max_messages: Option<usize>,
    ttl: Option<Duration>,
    keywords: Option<Vec<String>>,
    window: Option<usize>,
    max_results: Option<usize>,
    timeouts: Option<TimeoutConfig>,
    proxy: Option<Socks5Proxy>,
}

impl HarvestConfigBuilder {
    /// Sets the API origin, e.g. a local mock server in tests.
    #[must_use]
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Sets the relevance query sent to the provider.
    #[must_use]
    pub fn search_query(mut self, query: impl Into<String>) -> Self {
        self.search_query = Some(query.into());
        self
    }

    /// Sets the maximum number of messages fetched per harvest, at most [`MAX_MESSAGES`].
    #[must_use]
    pub fn max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = Some(max_messages);
        self
    }

    /// Sets the freshness window.
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Replaces the extractor keywords.
    #[must_use]
    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = Some(keywords.into_iter().map(Into::into).collect());
        self
    }

    /// Sets how many characters around a keyword are scanned.
    #[must_use]
    pub fn window(mut self, window: usize) -> Self {
        self.window = Some(window);
        self
    }

    /// Sets the maximum number of codes returned, at most [`MAX_RESULTS`].
    #[must_use]
    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Sets timeout configuration.
    #[must_use]
    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// Sets the per-message fetch timeout.
    #[must_use]
    pub fn message_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts
            .get_or_insert_with(TimeoutConfig::default)
            .message_fetch = timeout;
        self
    }

    /// Sets a SOCKS5 proxy for API requests.
    #[must_use]
    pub fn proxy(mut self, proxy: Socks5Proxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a value is out of range.
    pub fn build(self) -> Result<HarvestConfig> {
        let defaults = HarvestConfig::default();

        let api_base = match self.api_base {
            Some(raw) => parse_api_base(&raw)?,
            None => defaults.api_base,
        };

        let search_query = self.search_query.unwrap_or(defaults.search_query);
        if search_query.trim().is_empty() {
            return Err(invalid("search query must not be empty"));
        }

        let max_messages = self.max_messages.unwrap_or(defaults.max_messages);
        if !(1..=MAX_MESSAGES).contains(&max_messages) {
            return Err(invalid(format!(
                "max_messages must be between 1 and {MAX_MESSAGES}"
            )));
        }

        let ttl = self.ttl.unwrap_or(defaults.ttl);
        if ttl.is_zero() {
            return Err(invalid("ttl must be greater than zero"));
        }

        let keywords: Vec<String> = match self.keywords {
            Some(keywords) => keywords.iter().map(|k| k.to_ascii_lowercase()).collect(),
            None => defaults.extraction.keywords,
        };
        if keywords.is_empty() || keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(invalid("keywords must be non-empty strings"));
        }

        let window = self.window.unwrap_or(defaults.extraction.window);
        if window == 0 {
            return Err(invalid("window must be at least 1 character"));
        }

        let max_results = self.max_results.unwrap_or(defaults.extraction.max_results);
        if !(1..=MAX_RESULTS).contains(&max_results) {
            return Err(invalid(format!(
                "max_results must be between 1 and {MAX_RESULTS}"
            )));
        }

        Ok(HarvestConfig {
            api_base,
            search_query,
            max_messages,
            ttl,
            extraction: ExtractionConfig {
                keywords,
                window,
                max_results,
            },
            timeouts: self.timeouts.unwrap_or(defaults.timeouts),
            proxy: self.proxy,
        })
    }
}

fn parse_api_base(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| invalid(format!("api_base '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("api_base '{raw}' must use http or https")));
    }
    Ok(url)
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidConfig {
        message: message.into(),
    }
}
