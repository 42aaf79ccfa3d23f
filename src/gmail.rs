//! Gmail REST API implementation of [`MailSource`].
//!
//! # Example
//!
//! ```no_run
//! use mail_otp::{GmailClient, HarvestConfig, MailSource, StaticToken};
//!
//! # async fn example() -> mail_otp::Result<()> {
//! let config = HarvestConfig::builder().build()?;
//! let client = GmailClient::new(&config, StaticToken::new("ya29.access-token"))?;
//!
//! let refs = client.search_messages("is:unread code", 5).await?;
//! for message_ref in refs {
//!     let message = client.get_message(&message_ref.id).await?;
//!     println!("{}: {}", message.id, message.subject());
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::{HarvestConfig, TimeoutConfig};
use crate::error::{Error, Result};
use crate::payload::{Header, PayloadNode, RawMessage};
use crate::source::{MailSource, MessageRef};
use crate::token::TokenProvider;
use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const USER_AGENT: &str = concat!("mail-otp/", env!("CARGO_PKG_VERSION"));

const MESSAGES_PATH: [&str; 5] = ["gmail", "v1", "users", "me", "messages"];

/// HTTPS client for the Gmail API.
///
/// Every call asks the [`TokenProvider`] for a token. If the API answers
/// 401, the token is invalidated, a new one is requested and the call is
/// retried once; a second 401 is returned as [`Error::Unauthorized`].
pub struct GmailClient<T> {
    http: reqwest::Client,
    api_base: Url,
    timeouts: TimeoutConfig,
    tokens: T,
}

impl<T: TokenProvider> GmailClient<T> {
    /// Creates a client for the API origin, timeouts and proxy in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HttpClient`] if the transport cannot be built.
    pub fn new(config: &HarvestConfig, tokens: T) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(proxy.to_reqwest()?);
        }
        let http = builder
            .build()
            .map_err(|source| Error::HttpClient { source })?;

        Ok(Self {
            http,
            api_base: config.api_base.clone(),
            timeouts: config.timeouts.clone(),
            tokens,
        })
    }

    /// The token provider used by this client.
    #[must_use]
    pub fn tokens(&self) -> &T {
        &self.tokens
    }

    fn endpoint(&self, extra: Option<&str>) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidConfig {
                message: format!("api_base '{}' cannot carry a path", self.api_base),
            })?
            .pop_if_empty()
            .extend(MESSAGES_PATH)
            .extend(extra);
        Ok(url)
    }

    /// Performs an authorized GET, retrying once with a fresh token on 401.
    async fn get_json<R: DeserializeOwned>(
        &self,
        url: &Url,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<R> {
        let token = self.tokens.token().await?;
        match self.send(url, query, &token, timeout).await {
            Err(Error::Unauthorized { status }) => {
                debug!(status, "Token rejected, retrying with a fresh token");
                self.tokens.invalidate(&token).await;
                let token = self.tokens.token().await?;
                self.send(url, query, &token, timeout).await
            }
            other => other,
        }
    }

    async fn send<R: DeserializeOwned>(
        &self,
        url: &Url,
        query: &[(&str, &str)],
        token: &SecretString,
        timeout: Duration,
    ) -> Result<R> {
        let endpoint = url.path().to_string();
        let request = self
            .http
            .get(url.clone())
            .query(query)
            .bearer_auth(token.expose_secret());

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| Error::Timeout {
                endpoint: endpoint.clone(),
                timeout,
            })?
            .map_err(|source| Error::Request {
                endpoint: endpoint.clone(),
                source,
            })?;

        debug!(status = status.as_u16(), %endpoint, "Response received");

        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| Error::InvalidResponse { endpoint, source })
    }
}

#[async_trait]
impl<T: TokenProvider> MailSource for GmailClient<T> {
    #[instrument(name = "GmailClient::search_messages", skip(self))]
    async fn search_messages(&self, query: &str, max_results: usize) -> Result<Vec<MessageRef>> {
        let url = self.endpoint(None)?;
        let max_results = max_results.to_string();
        let list: ListResponse = self
            .get_json(
                &url,
                &[("q", query), ("maxResults", max_results.as_str())],
                self.timeouts.search,
            )
            .await?;

        let refs: Vec<MessageRef> = list
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| MessageRef::new(m.id))
            .collect();

        debug!(count = refs.len(), "Search returned messages");
        Ok(refs)
    }

    #[instrument(name = "GmailClient::get_message", skip(self), fields(message_id = %id))]
    async fn get_message(&self, id: &str) -> Result<RawMessage> {
        let url = self.endpoint(Some(id))?;
        let wire: WireMessage = self
            .get_json(&url, &[("format", "full")], self.timeouts.message_fetch)
            .await?;
        Ok(wire.into())
    }
}

impl<T> std::fmt::Debug for GmailClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmailClient")
            .field("api_base", &self.api_base.as_str())
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire format
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ListResponse {
    messages: Option<Vec<WireRef>>,
}

#[derive(Debug, Deserialize)]
struct WireRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    id: String,
    snippet: Option<String>,
    internal_date: Option<serde_json::Value>,
    payload: Option<WirePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    mime_type: Option<String>,
    headers: Option<Vec<WireHeader>>,
    body: Option<WireBody>,
    parts: Option<Vec<WirePart>>,
}

#[derive(Debug, Deserialize)]
struct WireHeader {
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct WireBody {
    data: Option<String>,
}

/// `internalDate` is a decimal string; anything unparsable is 0.
fn parse_internal_date(value: Option<&serde_json::Value>) -> i64 {
    match value {
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0),
        Some(serde_json::Value::Number(n)) => n.as_i64().unwrap_or(0),
        _ => 0,
    }
}

impl From<WirePart> for PayloadNode {
    fn from(part: WirePart) -> Self {
        PayloadNode {
            mime_type: part.mime_type.unwrap_or_default(),
            data: part.body.and_then(|b| b.data),
            parts: part
                .parts
                .unwrap_or_default()
                .into_iter()
                .map(PayloadNode::from)
                .collect(),
        }
    }
}

impl From<WireMessage> for RawMessage {
    fn from(mut wire: WireMessage) -> Self {
        let headers = wire
            .payload
            .as_mut()
            .and_then(|p| p.headers.take())
            .unwrap_or_default()
            .into_iter()
            .map(|h| Header::new(h.name, h.value))
            .collect();

        RawMessage {
            internal_date_ms: parse_internal_date(wire.internal_date.as_ref()),
            id: wire.id,
            headers,
            payload: wire.payload.map(PayloadNode::from),
            snippet: wire.snippet.unwrap_or_default(),
        }
    }
}
