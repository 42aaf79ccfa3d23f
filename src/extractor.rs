//! Candidate code extraction from decoded message text.
//!
//! This module provides the [`CodeExtractor`] trait and the built-in
//! [`KeywordExtractor`], which prefers digit runs close to words like "code"
//! or "OTP" and falls back to every plausible run when no keyword is present.
//!
//! # Example
//!
//! ```
//! use mail_otp::extractor::{CodeExtractor, KeywordExtractor};
//!
//! let extractor = KeywordExtractor::default();
//! assert_eq!(extractor.extract("Your OTP is 482910, do not share."), ["482910"]);
//!
//! // No keyword anywhere: every 4-8 digit run counts
//! assert_eq!(extractor.extract("Random text 12 3456 more text"), ["3456"]);
//! ```

use crate::config::ExtractionConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::ops::Range;

/// Shortest digit run accepted as a code.
pub const MIN_CODE_LEN: usize = 4;

/// Longest digit run accepted as a code.
pub const MAX_CODE_LEN: usize = 8;

/// Maximal runs of ASCII digits; length filtering happens afterwards so a
/// long run is never split into an acceptable piece.
static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("valid regex"));

/// Returns `true` if `value` is 4 to 8 ASCII digits and nothing else.
#[must_use]
pub fn is_otp_code(value: &str) -> bool {
    (MIN_CODE_LEN..=MAX_CODE_LEN).contains(&value.len()) && value.bytes().all(|b| b.is_ascii_digit())
}

/// Trait for pulling candidate codes out of a message's text.
///
/// Implement this trait to plug custom heuristics into the pipeline. Values
/// that are not 4-8 ASCII digits are discarded by the pipeline.
///
/// # Example
///
/// ```
/// use mail_otp::extractor::CodeExtractor;
///
/// struct LastLineExtractor;
///
/// impl CodeExtractor for LastLineExtractor {
///     fn extract(&self, text: &str) -> Vec<String> {
///         text.lines().last().map(|l| l.trim().to_string()).into_iter().collect()
///     }
///
///     fn description(&self) -> &str {
///         "last line"
///     }
/// }
/// ```
pub trait CodeExtractor: Send + Sync {
    /// Returns the distinct codes found in `text`, in no particular order.
    fn extract(&self, text: &str) -> Vec<String>;

    /// Returns a human-readable description of this extractor.
    ///
    /// Used in logging.
    fn description(&self) -> &str;
}

/// Keyword-proximity extractor.
///
/// For every (ASCII case-insensitive) occurrence of each keyword, digit runs
/// within `window` characters on either side are collected. A run counts if
/// it is 4-8 digits long, is not part of a longer run, and lies entirely
/// inside the window. If no keyword window yields anything, the whole text
/// is scanned.
#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    keywords: Vec<String>,
    window: usize,
    description: String,
}

impl KeywordExtractor {
    /// Creates an extractor for the given keywords and window half-width.
    ///
    /// Keywords are ASCII-lowercased, like the scanned text; empty keywords
    /// are ignored.
    #[must_use]
    pub fn new<I, S>(keywords: I, window: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().to_ascii_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            description: format!("codes within {window} chars of {keywords:?}"),
            keywords,
            window,
        }
    }

    /// Creates an extractor from an [`ExtractionConfig`].
    #[must_use]
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(&config.keywords, config.window)
    }

    /// The keywords searched, in order.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Byte range of the window around a keyword at `start..end`.
    fn window_around(&self, text: &str, start: usize, end: usize) -> Range<usize> {
        let from = text[..start]
            .char_indices()
            .rev()
            .take(self.window)
            .last()
            .map_or(start, |(i, _)| i);
        let to = text[end..]
            .char_indices()
            .nth(self.window)
            .map_or(text.len(), |(i, _)| end + i);
        from..to
    }
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

impl CodeExtractor for KeywordExtractor {
    fn extract(&self, text: &str) -> Vec<String> {
        let runs: Vec<Range<usize>> = DIGIT_RUN
            .find_iter(text)
            .filter(|m| (MIN_CODE_LEN..=MAX_CODE_LEN).contains(&m.len()))
            .map(|m| m.range())
            .collect();
        if runs.is_empty() {
            return Vec::new();
        }

        // ASCII lowercasing keeps byte offsets aligned with `text`
        let lower = text.to_ascii_lowercase();
        let mut found = CodeSet::default();

        for keyword in &self.keywords {
            let mut from = 0;
            while let Some(pos) = lower[from..].find(keyword.as_str()) {
                let start = from + pos;
                let end = start + keyword.len();
                let window = self.window_around(text, start, end);

                let first = runs.partition_point(|r| r.start < window.start);
                for run in runs[first..].iter().take_while(|r| r.end <= window.end) {
                    found.insert(&text[run.clone()]);
                }

                from = end;
            }
        }

        if found.is_empty() {
            for run in &runs {
                found.insert(&text[run.clone()]);
            }
        }

        found.into_vec()
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Insertion-ordered set of codes.
#[derive(Default)]
struct CodeSet<'a> {
    seen: HashSet<&'a str>,
    ordered: Vec<&'a str>,
}

impl<'a> CodeSet<'a> {
    fn insert(&mut self, code: &'a str) {
        if self.seen.insert(code) {
            self.ordered.push(code);
        }
    }

    fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    fn into_vec(self) -> Vec<String> {
        self.ordered.into_iter().map(str::to_owned).collect()
    }
}

/// Extractor using a closure for custom logic.
///
/// # Example
///
/// ```
/// use mail_otp::extractor::{ClosureExtractor, CodeExtractor};
///
/// let extractor = ClosureExtractor::new(
///     |text| {
///         text.lines()
///             .filter_map(|line| line.strip_prefix("PIN:"))
///             .map(|pin| pin.trim().to_string())
///             .collect()
///     },
///     "PIN line extractor",
/// );
///
/// assert_eq!(extractor.extract("Hello\nPIN: 8842\nBye"), ["8842"]);
/// ```
pub struct ClosureExtractor<F>
where
    F: Fn(&str) -> Vec<String> + Send + Sync,
{
    extract_fn: F,
    description: String,
}

impl<F> ClosureExtractor<F>
where
    F: Fn(&str) -> Vec<String> + Send + Sync,
{
    /// Creates a new closure-based extractor.
    #[must_use]
    pub fn new(extract_fn: F, description: impl Into<String>) -> Self {
        Self {
            extract_fn,
            description: description.into(),
        }
    }
}

impl<F> CodeExtractor for ClosureExtractor<F>
where
    F: Fn(&str) -> Vec<String> + Send + Sync,
{
    fn extract(&self, text: &str) -> Vec<String> {
        (self.extract_fn)(text)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl<F> std::fmt::Debug for ClosureExtractor<F>
where
    F: Fn(&str) -> Vec<String> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureExtractor")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
