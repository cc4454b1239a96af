//! Bounded, time-boxed store for GET responses.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use indexmap::IndexMap;
use tokio::time::Instant;

/// A response body as it came off the wire, kept so it can be re-normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Insertion-ordered cache: reads never change which entry goes first.
pub struct ResponseCache {
    /// Key -> (stored at, response), oldest insert first
    entries: Mutex<IndexMap<String, (Instant, CachedResponse)>>,
    max_entries: usize,
    max_age: Duration,
}

impl ResponseCache {
    /// Entries are hidden once older than `max_age`; storing past
    /// `max_entries` drops the oldest-inserted entry.
    pub fn new(max_entries: usize, max_age: Duration) -> Self {
        Self {
            entries: Mutex::new(IndexMap::with_capacity(max_entries)),
            max_entries,
            max_age,
        }
    }

    pub fn get(&self, key: &str) -> Option<CachedResponse> {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let (stored_at, response) = entries.get(key)?;
        if now.saturating_duration_since(*stored_at) < self.max_age {
            return Some(response.clone());
        }
        entries.shift_remove(key);
        None
    }

    pub fn put(&self, key: String, response: CachedResponse) {
        if self.max_entries == 0 {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        // A rewrite counts as a fresh insert
        entries.shift_remove(&key);
        while entries.len() >= self.max_entries {
            entries.shift_remove_index(0);
        }
        entries.insert(key, (Instant::now(), response));
    }

    /// Number of stored entries still younger than the max age.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|(stored_at, _)| now.saturating_duration_since(*stored_at) < self.max_age)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds the cache key: lower-cased URL plus sorted, encoded query params.
pub fn cache_key(url: &str, params: &[(String, String)]) -> String {
    let key = url.to_lowercase();
    if params.is_empty() {
        return key;
    }

    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort();
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(sorted.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish();
    format!("{key}?{query}")
}
