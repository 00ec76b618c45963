//! Cache Module
//!
//! Storage capability for cached responses and its two backends: a bounded
//! in-memory LRU with lazy TTL expiry, and Redis.

mod entry;
mod lru;
mod redis;
mod storer;
mod store;

#[cfg(test)]
mod property_tests;

use std::sync::Arc;

use tracing::info;

use crate::config::CacheBackend;

// Re-export public types
pub use self::redis::RedisStore;
pub use entry::{CacheEntry, Headers};
pub use lru::LruList;
pub use store::LruStore;
pub use storer::Storer;

/// Builds the single storer the process runs with.
///
/// Connecting to Redis is part of startup: a failure here is fatal.
pub async fn init_storer(backend: &CacheBackend) -> anyhow::Result<Arc<dyn Storer>> {
    match backend {
        CacheBackend::Redis { address, password, db } => {
            info!(address = %address, db = *db, "Initializing Redis cache");
            let url = RedisStore::connection_url(address, password, *db)?;
            let store = RedisStore::connect(&url).await.map_err(|err| {
                anyhow::anyhow!("failed to connect to Redis at {address}: {err}")
            })?;
            Ok(Arc::new(store))
        }
        CacheBackend::Lru { size } => {
            info!(size = *size, "Initializing LRU in-memory cache");
            Ok(Arc::new(LruStore::new(*size)))
        }
    }
}
