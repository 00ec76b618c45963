//! LRU Store Module
//!
//! Bounded in-memory backend combining the recency list with lazy TTL expiry.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::cache::{CacheEntry, LruList, Storer};

// == LRU Store ==
/// Thread-safe, capacity-bounded cache backend.
///
/// One mutex covers the recency list and its index together, and is held for
/// the whole of every operation. Expired entries are dropped only when read.
#[derive(Debug)]
pub struct LruStore {
    entries: Mutex<LruList<CacheEntry>>,
    capacity: usize,
}

impl LruStore {
    // == Constructor ==
    /// Creates a store holding at most `capacity` entries.
    ///
    /// A capacity of zero or less is raised to one.
    pub fn new(capacity: i64) -> Self {
        let capacity = usize::try_from(capacity).unwrap_or(0).max(1);
        Self {
            entries: Mutex::new(LruList::with_capacity(capacity.min(4096))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // == Lookup ==
    /// Returns the live entry for `key` and promotes it to most recently used.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn lookup(&self, key: &str) -> Option<CacheEntry> {
        let mut entries = self.lock();

        let expired = entries.get(key)?.is_expired_at(Utc::now());
        if expired {
            entries.remove(key);
            debug!(cache_key = key, "Dropped expired entry on read");
            return None;
        }

        entries.touch(key);
        entries.get(key).cloned()
    }

    // == Insert ==
    /// Stores an entry, evicting the least recently used one if a new key
    /// would exceed capacity. Updating an existing key never evicts.
    pub fn insert(&self, key: &str, entry: CacheEntry) {
        let mut entries = self.lock();

        if !entries.contains(key) && entries.len() >= self.capacity {
            if let Some((evicted, _)) = entries.evict_oldest() {
                debug!(cache_key = %evicted, "Evicted least recently used entry");
            }
        }

        entries.insert(key.to_string(), entry);
    }

    // == Remove ==
    /// Removes an entry if present.
    pub fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().into_iter().map(str::to_string).collect()
    }

    fn lock(&self) -> MutexGuard<'_, LruList<CacheEntry>> {
        // Every operation leaves the list consistent before it can panic.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Storer for LruStore {
    async fn get(&self, key: &str) -> Option<CacheEntry> {
        self.lookup(key)
    }

    async fn set(&self, key: &str, entry: CacheEntry) {
        self.insert(key, entry);
    }

    async fn delete(&self, key: &str) {
        self.remove(key);
    }
}
