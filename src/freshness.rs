//! Freshness and consumption filtering.
//!
//! A code is surfaced only while its message is younger than the TTL and
//! until the user has acted on it. Consumed codes are remembered by value in
//! a [`ConsumptionRecord`]; age is computed at read time from the
//! candidate's `date_ms`, so the record needs no expiry metadata.

use crate::candidate::Candidate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Set of codes the user has already used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsumptionRecord {
    codes: BTreeSet<String>,
}

impl ConsumptionRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `code` as consumed. Returns `false` if it was already recorded.
    pub fn mark_consumed(&mut self, code: impl Into<String>) -> bool {
        self.codes.insert(code.into())
    }

    /// Returns `true` if `code` has been consumed.
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    /// Number of recorded codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Returns `true` if nothing has been consumed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Recorded codes in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ConsumptionRecord {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            codes: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Keeps candidates that are unconsumed and strictly younger than `ttl`.
///
/// Candidates dated in the future count as fresh. Order is preserved and
/// `record` is not modified.
#[must_use]
pub fn filter_fresh(
    candidates: Vec<Candidate>,
    ttl: Duration,
    now_ms: i64,
    record: &ConsumptionRecord,
) -> Vec<Candidate> {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);

    candidates
        .into_iter()
        .filter(|candidate| {
            if record.contains(&candidate.code) {
                debug!(source_id = %candidate.source_id, "Dropping consumed code");
                return false;
            }
            let age_ms = now_ms.saturating_sub(candidate.date_ms);
            if age_ms >= ttl_ms {
                debug!(source_id = %candidate.source_id, age_ms, "Dropping expired code");
                return false;
            }
            true
        })
        .collect()
}

/// A [`ConsumptionRecord`] shared between concurrent readers and writers.
///
/// Clones share the same record. Insertions take the write lock, so
/// concurrent [`mark_consumed`](Self::mark_consumed) calls are never lost.
#[derive(Debug, Clone, Default)]
pub struct SharedConsumptionRecord {
    inner: Arc<RwLock<ConsumptionRecord>>,
}

impl SharedConsumptionRecord {
    /// Wraps an existing record.
    #[must_use]
    pub fn new(record: ConsumptionRecord) -> Self {
        Self {
            inner: Arc::new(RwLock::new(record)),
        }
    }

    /// Records `code` as consumed. Idempotent.
    pub async fn mark_consumed(&self, code: impl Into<String>) -> bool {
        let code = code.into();
        let inserted = self.inner.write().await.mark_consumed(code);
        debug!(inserted, "Marked code consumed");
        inserted
    }

    /// Returns `true` if `code` has been consumed.
    pub async fn contains(&self, code: &str) -> bool {
        self.inner.read().await.contains(code)
    }

    /// Returns a copy of the current record.
    pub async fn snapshot(&self) -> ConsumptionRecord {
        self.inner.read().await.clone()
    }

    /// Applies [`filter_fresh`] against the current record.
    pub async fn filter_fresh(
        &self,
        candidates: Vec<Candidate>,
        ttl: Duration,
        now_ms: i64,
    ) -> Vec<Candidate> {
        let record = self.inner.read().await;
        filter_fresh(candidates, ttl, now_ms, &record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE_MS: i64 = 60_000;
    const TTL: Duration = Duration::from_secs(600);

    fn candidate(code: &str, date_ms: i64) -> Candidate {
        Candidate {
            code: code.into(),
            subject: String::new(),
            from: String::new(),
            date_ms,
            source_id: format!("msg-{code}"),
        }
    }

    #[test]
    fn test_expired_candidate_excluded() {
        let now = 100 * MINUTE_MS;
        let result = filter_fresh(
            vec![candidate("1234", now - 11 * MINUTE_MS)],
            TTL,
            now,
            &ConsumptionRecord::new(),
        );
        assert!(result.is_empty());
    }

    #[test]
    fn test_ttl_boundary_is_exclusive() {
        let now = 100 * MINUTE_MS;
        let record = ConsumptionRecord::new();

        let at_ttl = filter_fresh(vec![candidate("1234", now - 10 * MINUTE_MS)], TTL, now, &record);
        assert!(at_ttl.is_empty());

        let just_inside = filter_fresh(
            vec![candidate("1234", now - 10 * MINUTE_MS + 1)],
            TTL,
            now,
            &record,
        );
        assert_eq!(just_inside.len(), 1);
    }

    #[test]
    fn test_consumed_candidate_excluded_even_if_fresh() {
        let now = 100 * MINUTE_MS;
        let mut record = ConsumptionRecord::new();
        record.mark_consumed("1234");

        let result = filter_fresh(
            vec![candidate("1234", now), candidate("5678", now)],
            TTL,
            now,
            &record,
        );
        assert_eq!(result, vec![candidate("5678", now)]);
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_future_dated_candidate_is_fresh() {
        let now = 100 * MINUTE_MS;
        let result = filter_fresh(
            vec![candidate("1234", now + MINUTE_MS)],
            TTL,
            now,
            &ConsumptionRecord::new(),
        );
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_order_preserved() {
        let now = 100 * MINUTE_MS;
        let input = vec![
            candidate("3333", now - MINUTE_MS),
            candidate("2222", now - 2 * MINUTE_MS),
            candidate("1111", now - 3 * MINUTE_MS),
        ];
        let result = filter_fresh(input.clone(), TTL, now, &ConsumptionRecord::new());
        assert_eq!(result, input);
    }

    #[test]
    fn test_mark_consumed_is_idempotent() {
        let mut record = ConsumptionRecord::new();
        assert!(record.mark_consumed("1234"));
        assert!(!record.mark_consumed("1234"));
        assert_eq!(record.len(), 1);
        assert_eq!(record.iter().collect::<Vec<_>>(), ["1234"]);
    }

    #[tokio::test]
    async fn test_shared_record_concurrent_inserts() {
        let shared = SharedConsumptionRecord::default();

        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let shared = shared.clone();
                tokio::spawn(async move { shared.mark_consumed(format!("{:06}", i % 25)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let snapshot = shared.snapshot().await;
        assert_eq!(snapshot.len(), 25);
        assert!(shared.contains("000024").await);
    }

    #[tokio::test]
    async fn test_shared_record_filter() {
        let shared = SharedConsumptionRecord::new(["1111"].into_iter().collect());
        let now = 100 * MINUTE_MS;

        let result = shared
            .filter_fresh(vec![candidate("1111", now), candidate("2222", now)], TTL, now)
            .await;
        assert_eq!(result, vec![candidate("2222", now)]);
    }
}
