// src/gateway/cache.rs
//! URL-keyed response cache with absolute TTL (no sliding refresh).

use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub url: String,
    pub payload: Value,
    /// Epoch millis from the gateway clock.
    pub fetched_at: u64,
}

#[derive(Debug)]
pub struct TtlCache {
    ttl_ms: u64,
    entries: HashMap<String, CacheEntry>,
}

impl TtlCache {
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            ttl_ms,
            entries: HashMap::new(),
        }
    }

    fn fresh(&self, e: &CacheEntry, now: u64) -> bool {
        now.saturating_sub(e.fetched_at) < self.ttl_ms
    }

    /// Fresh payload for `url`; a stale entry is evicted on the way.
    pub fn get(&mut self, url: &str, now: u64) -> Option<Value> {
        match self.entries.get(url) {
            Some(e) if self.fresh(e, now) => Some(e.payload.clone()),
            Some(_) => {
                self.entries.remove(url);
                None
            }
            None => None,
        }
    }

    pub fn insert(&mut self, url: &str, payload: Value, now: u64) {
        self.entries.insert(
            url.to_string(),
            CacheEntry {
                url: url.to_string(),
                payload,
                fetched_at: now,
            },
        );
    }

    /// Drop every expired entry; returns how many went.
    pub fn purge_expired(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl_ms;
        self.entries
            .retain(|_, e| now.saturating_sub(e.fetched_at) < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
