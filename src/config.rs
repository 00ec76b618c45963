//! Configuration Module
//!
//! Loads and validates proxy configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;
use tracing::warn;

use crate::error::ConfigError;

/// Which cache backend the proxy runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackend {
    /// Bounded in-process LRU
    Lru { size: i64 },
    /// Remote Redis instance
    Redis {
        address: String,
        password: String,
        db: i64,
    },
}

/// Proxy configuration parameters.
///
/// Everything except the upstream target has a default.
#[derive(Debug, Clone)]
pub struct Config {
    /// Origin every request is forwarded to
    pub target: Url,
    /// Proxy listener port
    pub server_port: u16,
    /// Admin listener port (health and stats)
    pub admin_port: u16,
    /// TTL in seconds applied to every stored response
    pub default_ttl: u64,
    /// Selected cache backend and its parameters
    pub backend: CacheBackend,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `PROXY_TARGET` - Origin URL (required)
    /// - `SERVER_PORT` - Proxy port (default: 8080)
    /// - `ADMIN_PORT` - Admin port (default: 9090)
    /// - `DEFAULT_TTL` - TTL in seconds (default: 300)
    /// - `CACHE_TYPE` - `lru` or `redis` (default: lru)
    /// - `LRU_SIZE` - LRU capacity (default: 1000)
    /// - `REDIS_ADDRESS` - `host:port` (default: 127.0.0.1:6379)
    /// - `REDIS_PASSWORD` - Redis password (default: none)
    /// - `REDIS_DB` - Redis database index (default: 0)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let target = lookup("PROXY_TARGET")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("PROXY_TARGET"))?;
        let target = parse_target(target.trim())?;

        let cache_type = lookup("CACHE_TYPE").unwrap_or_default();
        let backend = match cache_type.trim().to_ascii_lowercase().as_str() {
            "redis" => CacheBackend::Redis {
                address: lookup("REDIS_ADDRESS").unwrap_or_else(|| "127.0.0.1:6379".to_string()),
                password: lookup("REDIS_PASSWORD").unwrap_or_default(),
                db: parse_or(&lookup, "REDIS_DB", 0)?,
            },
            "lru" | "" => CacheBackend::Lru {
                size: parse_or(&lookup, "LRU_SIZE", 1000)?,
            },
            other => {
                warn!(cache_type = other, "Unknown cache type, defaulting to LRU");
                CacheBackend::Lru {
                    size: parse_or(&lookup, "LRU_SIZE", 1000)?,
                }
            }
        };

        Ok(Self {
            target,
            server_port: parse_or(&lookup, "SERVER_PORT", 8080)?,
            admin_port: parse_or(&lookup, "ADMIN_PORT", 9090)?,
            default_ttl: parse_or(&lookup, "DEFAULT_TTL", 300)?,
            backend,
        })
    }

    /// Returns the default TTL as a Duration.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }
}

/// Parses a variable, falling back to `default` only when it is unset.
fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
    }
}

fn parse_target(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidTarget {
        target: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(url)
}
