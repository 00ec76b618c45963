//! Cache Entry Module
//!
//! Defines the stored representation of a cached HTTP response and its
//! JSON wire format.

use std::fmt;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::error::CacheError;

// == Cache Entry ==
/// A complete cached response: status, headers, body and absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Upstream status code
    pub status_code: u16,
    /// Response headers in arrival order, values grouped per name
    pub headers: Headers,
    /// Raw response body
    #[serde(with = "body_base64")]
    pub body: Bytes,
    /// Absolute expiry instant
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry that expires `ttl` from now.
    pub fn new(status_code: u16, headers: Headers, body: Bytes, ttl: Duration) -> Self {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            status_code,
            headers,
            body,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry has expired at `now`.
    ///
    /// An entry is expired once `now` reaches `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Checks whether the entry has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    // == Time To Live ==
    /// Returns the time left before expiry, or None if already expired.
    pub fn ttl_remaining_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        (self.expires_at - now)
            .to_std()
            .ok()
            .filter(|ttl| !ttl.is_zero())
    }

    // == Wire Format ==
    /// Encodes the entry as JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CacheError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes an entry previously produced by [`CacheEntry::to_bytes`].
    pub fn from_slice(data: &[u8]) -> Result<Self, CacheError> {
        Ok(serde_json::from_slice(data)?)
    }
}

// == Headers ==
/// Ordered multi-map of header name to values.
///
/// Serialized as a JSON object of `name -> [values]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, Vec<String>)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value under `name`, keeping earlier values for that name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some((_, values)) => values.push(value),
            None => self.0.push((name, vec![value])),
        }
    }

    /// Captures a header map, keeping UTF-8 values byte for byte.
    ///
    /// Values that are not valid UTF-8 cannot be stored and are dropped.
    pub fn from_header_map(map: &HeaderMap) -> Self {
        let mut headers = Self::new();
        for name in map.keys() {
            for value in map.get_all(name) {
                match std::str::from_utf8(value.as_bytes()) {
                    Ok(v) => headers.append(name.as_str(), v),
                    Err(_) => debug!(header = %name, "Skipping non-UTF-8 header value"),
                }
            }
        }
        headers
    }

    /// Appends every stored value onto `map`, preserving per-name order.
    pub fn write_to(&self, map: &mut HeaderMap) {
        for (name, values) in &self.0 {
            let Ok(header_name) = HeaderName::from_bytes(name.as_bytes()) else {
                debug!(header = %name, "Skipping invalid stored header name");
                continue;
            };
            for value in values {
                match HeaderValue::from_bytes(value.as_bytes()) {
                    Ok(v) => {
                        map.append(header_name.clone(), v);
                    }
                    Err(_) => debug!(header = %name, "Skipping invalid stored header value"),
                }
            }
        }
    }

    /// Returns the values stored under `name`.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, values) in &self.0 {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = Headers;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of header names to lists of values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Headers, A::Error> {
                let mut headers = Headers::new();
                while let Some((name, values)) = access.next_entry::<String, Vec<String>>()? {
                    for value in values {
                        headers.append(name.clone(), value);
                    }
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_map(HeadersVisitor)
    }
}

// == Body Encoding ==
/// Standard base64 so arbitrary bytes survive a JSON round trip.
mod body_base64 {
    use super::*;

    pub fn serialize<S: Serializer>(body: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded)
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}
