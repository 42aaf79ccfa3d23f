//! Extracted codes and cross-message aggregation.

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One code found in one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// The code, 4 to 8 ASCII digits.
    pub code: String,
    /// Subject of the source message.
    pub subject: String,
    /// Sender of the source message.
    pub from: String,
    /// Receive time of the source message, milliseconds since the Unix epoch.
    pub date_ms: i64,
    /// Provider id of the source message.
    pub source_id: String,
}

impl Candidate {
    /// Receive time in the local timezone, if `date_ms` is representable.
    #[must_use]
    pub fn received_at(&self) -> Option<DateTime<Local>> {
        Local.timestamp_millis_opt(self.date_ms).single()
    }

    /// Human-readable receive time, or an empty string when unknown.
    #[must_use]
    pub fn formatted_date(&self) -> String {
        if self.date_ms == 0 {
            return String::new();
        }
        self.received_at()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default()
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subject = if self.subject.is_empty() {
            "(no subject)"
        } else {
            self.subject.as_str()
        };
        write!(f, "{}  {subject}", self.code)?;
        if !self.from.is_empty() {
            write!(f, " • {}", self.from)?;
        }
        let date = self.formatted_date();
        if !date.is_empty() {
            write!(f, "  [{date}]")?;
        }
        Ok(())
    }
}

/// Collapses candidates sharing a code and ranks the survivors.
///
/// For each code the candidate with the greatest `date_ms` is kept; on a tie
/// the first one seen wins. Survivors are ordered most recent first (ties
/// keep first-seen order) and truncated to `max_results`.
#[must_use]
pub fn aggregate(candidates: Vec<Candidate>, max_results: usize) -> Vec<Candidate> {
    let mut index_by_code: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<Candidate> = Vec::new();

    for candidate in candidates {
        match index_by_code.get(&candidate.code) {
            Some(&i) => {
                if candidate.date_ms > kept[i].date_ms {
                    kept[i] = candidate;
                }
            }
            None => {
                index_by_code.insert(candidate.code.clone(), kept.len());
                kept.push(candidate);
            }
        }
    }

    // Stable: equal timestamps stay in first-seen order
    kept.sort_by(|a, b| b.date_ms.cmp(&a.date_ms));
    kept.truncate(max_results);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(code: &str, date_ms: i64, source_id: &str) -> Candidate {
        Candidate {
            code: code.into(),
            subject: format!("subject {source_id}"),
            from: "no-reply@example.com".into(),
            date_ms,
            source_id: source_id.into(),
        }
    }

    #[test]
    fn test_duplicate_keeps_most_recent() {
        let result = aggregate(
            vec![candidate("551234", 1000, "a"), candidate("551234", 2000, "b")],
            10,
        );
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].date_ms, 2000);
        assert_eq!(result[0].source_id, "b");
    }

    #[test]
    fn test_duplicate_with_equal_date_keeps_first_seen() {
        let result = aggregate(
            vec![candidate("1111", 500, "first"), candidate("1111", 500, "second")],
            10,
        );
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].source_id, "first");
    }

    #[test]
    fn test_sorted_most_recent_first() {
        let result = aggregate(
            vec![
                candidate("1111", 100, "a"),
                candidate("2222", 300, "b"),
                candidate("3333", 200, "c"),
                candidate("4444", 300, "d"),
            ],
            10,
        );
        let codes: Vec<_> = result.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, ["2222", "4444", "3333", "1111"]);
    }

    #[test]
    fn test_truncates_to_max_results() {
        let many = (0..25)
            .map(|i| candidate(&format!("{:04}", 1000 + i), i64::from(i), "m"))
            .collect();
        let result = aggregate(many, 10);
        assert_eq!(result.len(), 10);
        assert_eq!(result[0].code, "1024");
        assert!(result.windows(2).all(|w| w[0].date_ms >= w[1].date_ms));
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let input = vec![
            candidate("1111", 100, "a"),
            candidate("2222", 300, "b"),
            candidate("1111", 400, "c"),
        ];
        let once = aggregate(input, 10);
        let twice = aggregate(once.clone(), 10);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(Vec::new(), 10).is_empty());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(candidate("482910", 1_700_000_000_000, "m1")).unwrap();
        assert_eq!(json["dateMs"], 1_700_000_000_000_i64);
        assert_eq!(json["sourceId"], "m1");
        assert_eq!(json["code"], "482910");
    }

    #[test]
    fn test_display_line() {
        let mut c = candidate("482910", 0, "m1");
        c.subject.clear();
        assert_eq!(c.to_string(), "482910  (no subject) • no-reply@example.com");

        let c = candidate("482910", 1_700_000_000_000, "m1");
        let line = c.to_string();
        assert!(line.starts_with("482910  subject m1 • no-reply@example.com  ["));
        assert!(line.ends_with(']'));
    }
}
