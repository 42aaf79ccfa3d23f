//! Message model and body payload decoding.
//!
//! A [`RawMessage`] carries its body as a tree of [`PayloadNode`]s, the way
//! multi-part email arrives from the provider. [`collect_text`] flattens that
//! tree into the text the extractor scans.
//!
//! # Example
//!
//! ```
//! use mail_otp::payload::{collect_text, PayloadNode};
//!
//! let body = PayloadNode::multipart(
//!     "multipart/alternative",
//!     vec![
//!         PayloadNode::from_text("text/plain", "Your code is 482910"),
//!         PayloadNode::from_text("text/html", "<p>Your code is <b>482910</b></p>"),
//!     ],
//! );
//!
//! let text = collect_text(&body);
//! assert!(text.starts_with("Your code is 482910\n"));
//! ```

use crate::markup::strip_markup;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use tracing::debug;

/// Upper bound on the number of payload nodes visited per message.
pub const MAX_PAYLOAD_NODES: usize = 256;

/// Nesting depth below which child parts are ignored.
pub const MAX_PAYLOAD_DEPTH: usize = 32;

/// base64url, with or without trailing padding.
const BODY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A single message header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Header name as sent (lookups ignore case).
    pub name: String,
    /// Header value.
    pub value: String,
}

impl Header {
    /// Creates a header.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One node of a message body tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadNode {
    /// MIME type, e.g. `text/plain` or `multipart/alternative`.
    pub mime_type: String,
    /// base64url-encoded body data, if this node carries content.
    pub data: Option<String>,
    /// Child parts in document order.
    pub parts: Vec<PayloadNode>,
}

impl PayloadNode {
    /// Creates a content node with already-encoded body data.
    #[must_use]
    pub fn leaf(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: Some(data.into()),
            parts: Vec::new(),
        }
    }

    /// Creates a content node from plain text, encoding it the way the
    /// provider does.
    #[must_use]
    pub fn from_text(mime_type: impl Into<String>, text: &str) -> Self {
        Self::leaf(mime_type, BODY_ENGINE.encode(text))
    }

    /// Creates a container node.
    #[must_use]
    pub fn multipart(mime_type: impl Into<String>, parts: Vec<PayloadNode>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: None,
            parts,
        }
    }

    fn text_kind(&self) -> Option<TextKind> {
        if self.mime_type.eq_ignore_ascii_case("text/plain") {
            Some(TextKind::Plain)
        } else if self.mime_type.eq_ignore_ascii_case("text/html") {
            Some(TextKind::Html)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum TextKind {
    Plain,
    Html,
}

/// A message as fetched from the provider.
#[derive(Debug, Clone, Default)]
pub struct RawMessage {
    /// Provider-assigned message id.
    pub id: String,
    /// Headers in the order they were received.
    pub headers: Vec<Header>,
    /// Body tree, if the provider returned one.
    pub payload: Option<PayloadNode>,
    /// Receive time in milliseconds since the Unix epoch.
    pub internal_date_ms: i64,
    /// Short plain-text summary supplied by the provider.
    pub snippet: String,
}

impl RawMessage {
    /// Returns the first header named `name`, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// The `Subject` header, or an empty string.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.header("Subject").unwrap_or_default()
    }

    /// The `From` header, or an empty string.
    #[must_use]
    pub fn from(&self) -> &str {
        self.header("From").unwrap_or_default()
    }

    /// Decoded text of every `text/plain` and `text/html` part, newline-joined.
    #[must_use]
    pub fn body_text(&self) -> String {
        self.payload.as_ref().map(collect_text).unwrap_or_default()
    }
}

/// Flattens a payload tree into newline-joined text.
///
/// Nodes are visited depth-first in document order. `text/plain` parts are
/// used as-is and `text/html` parts go through [`strip_markup`]. A part that
/// fails to decode contributes an empty string. Traversal stops after
/// [`MAX_PAYLOAD_NODES`] nodes and does not descend past
/// [`MAX_PAYLOAD_DEPTH`].
#[must_use]
pub fn collect_text(payload: &PayloadNode) -> String {
    let mut texts = Vec::new();
    let mut stack = vec![(payload, 0_usize)];
    let mut visited = 0_usize;

    while let Some((node, depth)) = stack.pop() {
        visited += 1;
        if visited > MAX_PAYLOAD_NODES {
            debug!(limit = MAX_PAYLOAD_NODES, "Payload node budget exhausted");
            break;
        }

        if let (Some(kind), Some(data)) = (node.text_kind(), node.data.as_deref()) {
            if !data.is_empty() {
                let raw = decode_body(data);
                texts.push(match kind {
                    TextKind::Plain => raw,
                    TextKind::Html => strip_markup(&raw),
                });
            }
        }

        if node.parts.is_empty() {
            continue;
        }
        if depth >= MAX_PAYLOAD_DEPTH {
            debug!(depth, "Payload nesting too deep, ignoring child parts");
            continue;
        }
        // Reverse so the first child is popped first.
        for child in node.parts.iter().rev() {
            stack.push((child, depth + 1));
        }
    }

    texts.join("\n")
}

/// Decodes base64url body data to UTF-8, replacing invalid sequences.
///
/// Returns an empty string if the data is not valid base64.
#[must_use]
pub fn decode_body(data: &str) -> String {
    let normalized: String = data
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    match BODY_ENGINE.decode(normalized.as_bytes()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            debug!(error = %e, "Failed to decode body part, treating as empty");
            String::new()
        }
    }
}
