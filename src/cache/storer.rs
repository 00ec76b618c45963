//! Storer Module
//!
//! The storage capability the proxy handler is written against.

use async_trait::async_trait;

use crate::cache::CacheEntry;

// == Storer ==
/// Get/Set/Delete contract shared by every cache backend.
///
/// Implementations never surface errors: a failing backend reports a miss
/// from `get` and silently drops `set` and `delete`. Callers must treat the
/// cache as an optimization only.
#[async_trait]
pub trait Storer: Send + Sync {
    /// Returns the live entry for `key`, or None on a miss.
    async fn get(&self, key: &str) -> Option<CacheEntry>;

    /// Stores `entry` under `key`. Best effort.
    async fn set(&self, key: &str, entry: CacheEntry);

    /// Removes `key`. Idempotent.
    async fn delete(&self, key: &str);
}
