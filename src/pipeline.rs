//! Pure message-to-code pipeline.
//!
//! These functions never fail and have no side effects: decode each
//! message, extract codes, aggregate across messages and optionally filter
//! by freshness and consumption.

use crate::candidate::{aggregate, Candidate};
use crate::config::{ExtractionConfig, MAX_RESULTS};
use crate::extractor::{is_otp_code, CodeExtractor, KeywordExtractor};
use crate::freshness::{filter_fresh, ConsumptionRecord};
use crate::payload::RawMessage;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

/// Text scanned for one message: the subject, a newline, then the decoded
/// body, falling back to the snippet and then the subject when the body is empty.
pub(crate) fn message_text(message: &RawMessage) -> String {
    let subject = message.subject();
    let mut body = message.body_text();
    if body.is_empty() {
        body = if message.snippet.is_empty() {
            subject.to_string()
        } else {
            message.snippet.clone()
        };
    }
    format!("{subject}\n{body}")
}

/// One candidate per distinct valid code in `message`.
pub(crate) fn message_candidates(
    message: &RawMessage,
    extractor: &dyn CodeExtractor,
) -> Vec<Candidate> {
    let text = message_text(message);
    let mut seen = HashSet::new();

    extractor
        .extract(&text)
        .into_iter()
        .filter(|code| {
            if is_otp_code(code) {
                true
            } else {
                debug!(
                    message_id = %message.id,
                    extractor = %extractor.description(),
                    "Discarding value that is not a 4-8 digit code"
                );
                false
            }
        })
        .filter(|code| seen.insert(code.clone()))
        .map(|code| Candidate {
            code,
            subject: message.subject().to_string(),
            from: message.from().to_string(),
            date_ms: message.internal_date_ms,
            source_id: message.id.clone(),
        })
        .collect()
}

/// Extracts, deduplicates and ranks codes from `messages` with a custom extractor.
///
/// At most `max_results` codes are returned, and never more than [`MAX_RESULTS`].
#[must_use]
pub fn extract_candidates(
    messages: &[RawMessage],
    extractor: &dyn CodeExtractor,
    max_results: usize,
) -> Vec<Candidate> {
    let all: Vec<Candidate> = messages
        .iter()
        .flat_map(|message| message_candidates(message, extractor))
        .collect();

    debug!(
        messages = messages.len(),
        raw_candidates = all.len(),
        "Extracted candidates"
    );

    aggregate(all, max_results.min(MAX_RESULTS))
}

/// Ranked, deduplicated codes found in `messages`, most recent first.
///
/// # Example
///
/// ```
/// use mail_otp::payload::{Header, PayloadNode, RawMessage};
/// use mail_otp::{get_candidates, ExtractionConfig};
///
/// let message = RawMessage {
///     id: "m1".into(),
///     headers: vec![Header::new("Subject", "Sign in")],
///     payload: Some(PayloadNode::from_text("text/plain", "Your OTP is 482910")),
///     internal_date_ms: 1_000,
///     snippet: String::new(),
/// };
///
/// let candidates = get_candidates(&[message], &ExtractionConfig::default());
/// assert_eq!(candidates[0].code, "482910");
/// assert_eq!(candidates[0].subject, "Sign in");
/// ```
#[must_use]
pub fn get_candidates(messages: &[RawMessage], config: &ExtractionConfig) -> Vec<Candidate> {
    extract_candidates(messages, &KeywordExtractor::from_config(config), config.max_results)
}

/// [`get_candidates`] restricted to unconsumed codes younger than `ttl` at `now_ms`.
#[must_use]
pub fn get_fresh_unconsumed(
    messages: &[RawMessage],
    config: &ExtractionConfig,
    ttl: Duration,
    record: &ConsumptionRecord,
    now_ms: i64,
) -> Vec<Candidate> {
    filter_fresh(get_candidates(messages, config), ttl, now_ms, record)
}
