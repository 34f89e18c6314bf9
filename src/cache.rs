use dashmap::DashMap;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tokio::time::Instant;

use crate::models::RequestOptions;

// Cache entry with expiry
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub payload: Value,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Create a cache key (hash of url + serialized options).
///
/// `url` must not carry injected credentials.
pub fn make_cache_key(url: &str, options: &RequestOptions) -> String {
    // serializing a struct of strings and json values cannot fail
    let options_json = serde_json::to_string(options).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(url);
    hasher.update(options_json);
    format!("{:x}", hasher.finalize())
}

/// Response cache with lazy expiry.
///
/// Stale entries stay in the map until they are overwritten by a later
/// successful fetch or removed by [`ResponseCache::sweep_expired`].
#[derive(Default)]
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh payload for `key`, if any. Stale entries read as absent.
    pub fn get_fresh(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.payload.clone())
    }

    /// Raw entry regardless of freshness.
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    // last writer wins
    pub fn insert(&self, key: String, payload: Value, ttl: Duration) {
        self.entries.insert(
            key,
            CacheEntry {
                payload,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Drop every stale entry. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
