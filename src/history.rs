use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::data_models::SearchEvent;

/// Number of events kept before the oldest ones are discarded.
pub const HISTORY_CAP: usize = 1000;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PopularQuery {
    pub query: String,
    pub count: u64,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DayStats {
    pub date: NaiveDate,
    pub count: u64,
    pub per_query: BTreeMap<String, u64>,
}

/// Store size and one day's stats, read under a single lock.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct HistoryTotals {
    pub total: usize,
    pub day: DayStats,
}

fn day_stats<'a>(events: impl Iterator<Item = &'a SearchEvent>, date: NaiveDate) -> DayStats {
    let mut per_query = BTreeMap::new();
    let mut count = 0;
    for event in events.filter(|e| e.timestamp.with_timezone(&Local).date_naive() == date) {
        count += 1;
        *per_query.entry(event.query.clone()).or_insert(0) += 1;
    }
    DayStats {
        date,
        count,
        per_query,
    }
}

/// Bounded in-memory log of search events, newest first.
///
/// Ordering follows insertion, not the `timestamp` field. Appending and
/// truncating happen under the same lock, so concurrent writers can never
/// push the store past its cap.
pub struct HistoryStore {
    cap: usize,
    events: Mutex<VecDeque<SearchEvent>>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAP)
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            cap,
            events: Mutex::new(VecDeque::with_capacity(cap.min(HISTORY_CAP))),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    // A panic while holding the lock cannot leave the deque half-updated,
    // so a poisoned lock is still safe to read.
    fn events(&self) -> MutexGuard<'_, VecDeque<SearchEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, event: SearchEvent) {
        let mut events = self.events();
        events.push_front(event);
        events.truncate(self.cap);
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events().is_empty()
    }

    pub fn recent(&self, limit: i64) -> Vec<SearchEvent> {
        if limit <= 0 {
            return Vec::new();
        }
        let events = self.events();
        let take = (limit as usize).min(events.len());
        events.iter().take(take).cloned().collect()
    }

    /// Query strings ranked by how often they were searched.
    ///
    /// Ties keep the order in which the newest-first scan first met them;
    /// callers should treat that order as unspecified.
    pub fn popular(&self, limit: i64) -> Vec<PopularQuery> {
        if limit <= 0 {
            return Vec::new();
        }
        let events = self.events();
        let mut counts: HashMap<&str, (u64, usize)> = HashMap::new();
        for (idx, event) in events.iter().enumerate() {
            counts.entry(event.query.as_str()).or_insert((0, idx)).0 += 1;
        }

        let mut ranked: Vec<(&str, u64, usize)> = counts
            .into_iter()
            .map(|(query, (count, first_seen))| (query, count, first_seen))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        ranked
            .into_iter()
            .take(limit as usize)
            .map(|(query, count, _)| PopularQuery {
                query: query.to_string(),
                count,
            })
            .collect()
    }

    pub fn stats_for_today(&self) -> DayStats {
        self.stats_for_day(Local::now().date_naive())
    }

    /// Events whose timestamp falls on `date` in the local timezone.
    pub fn stats_for_day(&self, date: NaiveDate) -> DayStats {
        day_stats(self.events().iter(), date)
    }

    pub fn totals_for_today(&self) -> HistoryTotals {
        self.totals_for_day(Local::now().date_naive())
    }

    /// Like `stats_for_day`, plus the store size from the same snapshot.
    pub fn totals_for_day(&self, date: NaiveDate) -> HistoryTotals {
        let events = self.events();
        HistoryTotals {
            total: events.len(),
            day: day_stats(events.iter(), date),
        }
    }

    /// Distinct past queries starting with `prefix` (case-insensitive), newest first.
    pub fn suggest(&self, prefix: &str, limit: usize) -> Vec<String> {
        let needle = prefix.trim().to_lowercase();
        if needle.is_empty() || limit == 0 {
            return Vec::new();
        }
        let events = self.events();
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for event in events.iter() {
            let lowered = event.query.to_lowercase();
            if lowered.starts_with(&needle) && seen.insert(lowered) {
                out.push(event.query.clone());
                if out.len() == limit {
                    break;
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(query: &str) -> SearchEvent {
        SearchEvent::new(query.to_string(), 1, 1, "/api/search".to_string())
    }

    #[test]
    fn test_truncates_to_cap() {
        let store = HistoryStore::with_capacity(3);
        for q in ["a", "b", "c", "d", "e"] {
            store.record(event(q));
        }
        let queries: Vec<String> = store.recent(10).into_iter().map(|e| e.query).collect();
        assert_eq!(queries, vec!["e", "d", "c"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_popular_ranks_by_count() {
        let store = HistoryStore::new();
        for q in ["rust", "go", "rust", "zig", "rust", "go"] {
            store.record(event(q));
        }
        let popular = store.popular(2);
        assert_eq!(
            popular,
            vec![
                PopularQuery {
                    query: "rust".into(),
                    count: 3,
                },
                PopularQuery {
                    query: "go".into(),
                    count: 2,
                },
            ]
        );
    }

    #[test]
    fn test_totals_share_one_snapshot() {
        let store = HistoryStore::with_capacity(4);
        let today = Local::now();
        let yesterday = today - chrono::Duration::days(1);
        for (q, ts) in [("old", yesterday), ("a", today), ("b", today), ("a", today)] {
            store.record(SearchEvent::at(
                ts.with_timezone(&chrono::Utc),
                q.to_string(),
                1,
                1,
                "/api/search".to_string(),
            ));
        }

        let totals = store.totals_for_day(today.date_naive());
        assert_eq!(totals.total, 4);
        assert_eq!(totals.day.count, 3);
        assert_eq!(totals.day.per_query.get("a"), Some(&2));
        assert_eq!(totals.day, store.stats_for_day(today.date_naive()));
    }

    #[test]
    fn test_suggest_dedupes_case_insensitively() {
        let store = HistoryStore::new();
        for q in ["Rust book", "rust async", "python", "rust BOOK"] {
            store.record(event(q));
        }
        assert_eq!(store.suggest("ru", 5), vec!["rust BOOK", "rust async"]);
        assert!(store.suggest("   ", 5).is_empty());
    }
}
