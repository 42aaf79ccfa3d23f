//! # mail-otp
//!
//! Async extraction of one-time passcodes from recent Gmail messages.
//!
//! This crate provides a high-level, async API for:
//! - Searching a mailbox for recent messages that look like OTP notifications
//! - Decoding MIME payloads and pulling 4-8 digit codes near OTP keywords
//! - Ranking codes by recency and dropping expired or already-used ones
//! - Filling a chosen code into the most likely input field of a page
//!
//! ## Features
//!
//! - **`observability`**: Enables OpenTelemetry integration for distributed tracing.
//!   Without this feature, tracing spans are still emitted but require no OTEL dependencies.
//!
//! ## Quick Start
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
//! let codes = harvester.fetch_fresh(&consumed).await?;
//! if let Some(latest) = codes.first() {
//!     println!("Latest code: {}", latest.code);
//!     consumed.mark_consumed(latest.code.clone()).await;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Using a SOCKS5 Proxy
//!
//! ```no_run
//! use mail_otp::{GmailClient, HarvestConfig, Socks5Proxy, StaticToken};
//!
//! # fn example() -> mail_otp::Result<()> {
//! let config = HarvestConfig::builder()
//!     .proxy(Socks5Proxy::with_auth("proxy.example.com", 1080, "user", "pass"))
//!     .build()?;
//!
//! let client = GmailClient::new(&config, StaticToken::new("ya29.access-token"))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Working Offline
//!
//! The extraction pipeline is pure and works on already-fetched messages:
//!
//! ```
//! use mail_otp::payload::{Header, PayloadNode, RawMessage};
//! use mail_otp::{get_fresh_unconsumed, ConsumptionRecord, ExtractionConfig};
//! use std::time::Duration;
//!
//! let message = RawMessage {
//!     id: "m1".into(),
//!     headers: vec![Header::new("Subject", "Your login code")],
//!     payload: Some(PayloadNode::from_text("text/html", "<p>Code: <b>771204</b></p>")),
//!     internal_date_ms: 1_000_000,
//!     snippet: String::new(),
//! };
//!
//! let fresh = get_fresh_unconsumed(
//!     &[message],
//!     &ExtractionConfig::default(),
//!     Duration::from_secs(600),
//!     &ConsumptionRecord::new(),
//!     1_060_000,
//! );
//! assert_eq!(fresh[0].code, "771204");
//! ```
//!
//! ## Custom Extraction
//!
//! ```
//! use mail_otp::extractor::{ClosureExtractor, CodeExtractor};
//!
//! let extractor = ClosureExtractor::new(
//!     |text: &str| {
//!         text.lines()
//!             .filter_map(|line| line.strip_prefix("PIN:"))
//!             .map(|pin| pin.trim().to_string())
//!             .collect()
//!     },
//!     "PIN lines",
//! );
//! assert_eq!(extractor.extract("Hello\nPIN: 9031"), ["9031"]);
//! ```
//!
//! ## Error Handling
//!
//! All errors implement `std::error::Error` and provide context. Use [`Error::is_retryable`]
//! to determine if an operation can be retried, and [`Error::requires_reauth`] to
//! decide whether to send the user back through sign-in:
//!
//! ```
//! use mail_otp::Error;
//!
//! fn handle_error(error: &Error) {
//!     if error.requires_reauth() {
//!         println!("Sign in again: {}", error);
//!     } else if error.is_retryable() {
//!         println!("Transient error, can retry: {}", error);
//!     } else {
//!         println!("Permanent error: {}", error);
//!     }
//! }
//! ```
//!
//! ## Observability
//!
//! The crate uses `tracing` for instrumentation. All network and storage operations
//! emit spans with structured fields.
//!
//! ### Span Naming Convention
//!
//! - `OtpHarvester::fetch_messages` - Search plus concurrent message fetch
//! - `OtpHarvester::fetch_candidates` - Fetch and extract
//! - `OtpHarvester::fetch_fresh` - Fetch, extract and filter
//! - `GmailClient::search_messages` - Message search request
//! - `GmailClient::get_message` - Single message request
//! - `ConsumptionStore::load` / `ConsumptionStore::save` - Record persistence
//!
//! ### Standard Fields
//!
//! - `message_id` - Provider message id
//! - `max_messages` - Search cap
//! - `candidate_count` - Codes surviving a stage
//! - `category` - [`ErrorCategory`] of a skipped failure
//!
//! Enable the `observability` feature for OpenTelemetry integration.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
pub mod autofill;
pub mod candidate;
pub mod config;
pub mod error;
pub mod extractor;
pub mod freshness;
pub mod markup;
pub mod payload;
pub mod proxy;
pub mod source;
pub mod store;
pub mod token;

// Internal modules
mod gmail;
mod harvester;
mod pipeline;

// Re-exports for ergonomic API
pub use candidate::Candidate;
pub use config::{ExtractionConfig, HarvestConfig, HarvestConfigBuilder, TimeoutConfig};
pub use error::{Error, ErrorCategory, Result};
pub use freshness::{ConsumptionRecord, SharedConsumptionRecord};
pub use gmail::GmailClient;
pub use harvester::OtpHarvester;
pub use pipeline::{extract_candidates, get_candidates, get_fresh_unconsumed};
pub use proxy::{ProxyAuth, Socks5Proxy};
pub use source::{MailSource, MessageRef};
pub use store::ConsumptionStore;
pub use token::{StaticToken, TokenProvider};
