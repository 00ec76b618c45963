//! Redis Store Module
//!
//! Remote backend: entries live in Redis as JSON and expire natively.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use reqwest::Url;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, Storer};
use crate::error::{CacheError, ConfigError};

// == Redis Store ==
/// Cache backend delegating storage and expiry to Redis.
///
/// Every failure is logged and turned into a miss or a skipped write, so a
/// client cannot tell an empty cache from an unreachable one.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    // == Connect ==
    /// Opens a managed connection and checks it with `PING`.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url)?;
        let mut conn = ConnectionManager::new(client).await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug!(reply = %pong, "Redis connection established");
        Ok(Self { conn })
    }

    /// Builds a `redis://` URL from address, credential and database index.
    pub fn connection_url(address: &str, password: &str, db: i64) -> Result<String, ConfigError> {
        let invalid = || ConfigError::InvalidBackendAddress(address.to_string());

        let mut url = Url::parse(&format!("redis://{address}/{db}")).map_err(|_| invalid())?;
        if url.host_str().map_or(true, str::is_empty) {
            return Err(invalid());
        }
        if !password.is_empty() {
            url.set_password(Some(password)).map_err(|_| invalid())?;
        }
        Ok(url.to_string())
    }

    async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn store(&self, key: &str, entry: &CacheEntry, ttl_ms: u64) -> Result<(), CacheError> {
        let data = entry.to_bytes()?;
        let mut conn = self.conn.clone();
        conn.pset_ex::<_, _, ()>(key, data, ttl_ms).await?;
        Ok(())
    }
}

/// Turns the raw result of a lookup into an entry. Transport errors and
/// payloads that do not decode are both misses.
fn decode_lookup(key: &str, lookup: Result<Option<Vec<u8>>, CacheError>) -> Option<CacheEntry> {
    let data = match lookup {
        Ok(data) => data?,
        Err(err) => {
            warn!(cache_key = key, error = %err, "Redis get failed, treating as miss");
            return None;
        }
    };

    match CacheEntry::from_slice(&data) {
        Ok(entry) => Some(entry),
        Err(err) => {
            warn!(cache_key = key, error = %err, "Stored entry is unreadable, treating as miss");
            None
        }
    }
}

/// Milliseconds the entry has left at `now`, or None if it must not be stored.
fn expiry_millis(entry: &CacheEntry, now: DateTime<Utc>) -> Option<u64> {
    let ttl = entry.ttl_remaining_at(now)?;
    let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    (millis > 0).then_some(millis)
}

#[async_trait]
impl Storer for RedisStore {
    async fn get(&self, key: &str) -> Option<CacheEntry> {
        decode_lookup(key, self.fetch(key).await)
    }

    async fn set(&self, key: &str, entry: CacheEntry) {
        let Some(ttl_ms) = expiry_millis(&entry, Utc::now()) else {
            debug!(cache_key = key, "Entry already expired, not storing");
            return;
        };

        if let Err(err) = self.store(key, &entry, ttl_ms).await {
            warn!(cache_key = key, error = %err, "Redis set failed, skipping store");
        }
    }

    async fn delete(&self, key: &str) {
        let mut conn = self.conn.clone();
        if let Err(err) = conn.del::<_, ()>(key).await {
            warn!(cache_key = key, error = %err, "Redis delete failed");
        }
    }
}
