//! Proxy Handler
//!
//! Per-request cache decision: derive the key, serve hits from the storer,
//! forward misses and store cacheable responses.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::Response,
};
use tracing::{info, warn};

use crate::cache::{CacheEntry, Headers, Storer};
use crate::error::{ProxyError, Result};
use crate::metrics::ProxyMetrics;
use crate::proxy::key;
use crate::proxy::upstream::{buffered_response, strip_hop_by_hop, stream_response, Upstream};

/// State shared by every proxied request.
#[derive(Clone)]
pub struct ProxyState {
    storer: Arc<dyn Storer>,
    upstream: Arc<Upstream>,
    default_ttl: Duration,
    metrics: Arc<ProxyMetrics>,
}

/// Per-request record carried across the forwarding hop on the cached path.
#[derive(Debug, Clone)]
pub struct CacheContext {
    pub cache_key: String,
}

impl ProxyState {
    pub fn new(
        storer: Arc<dyn Storer>,
        upstream: Upstream,
        default_ttl: Duration,
        metrics: Arc<ProxyMetrics>,
    ) -> Self {
        Self {
            storer,
            upstream: Arc::new(upstream),
            default_ttl,
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<ProxyMetrics> {
        &self.metrics
    }

    async fn forward(&self, req: Request) -> Result<reqwest::Response> {
        self.upstream.forward(req).await.inspect_err(|err| {
            warn!(error = %err, "Upstream request failed");
            self.metrics.record_upstream_error();
        })
    }

    // == Response Interception ==
    /// Decides whether an upstream response is stored, then relays it.
    ///
    /// Only `200 OK` without `Cache-Control: no-store` is buffered and stored;
    /// everything else streams through untouched.
    async fn intercept(
        &self,
        upstream: reqwest::Response,
        ctx: Option<&CacheContext>,
    ) -> Result<Response> {
        if upstream.status() != StatusCode::OK || has_no_store(upstream.headers()) {
            return Ok(stream_response(upstream));
        }
        let Some(ctx) = ctx else {
            return Ok(stream_response(upstream));
        };

        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        strip_hop_by_hop(&mut headers);

        let body = upstream.bytes().await.map_err(|err| {
            warn!(cache_key = %ctx.cache_key, error = %err, "Failed to read upstream body");
            ProxyError::UpstreamBody(err)
        })?;

        let entry = CacheEntry::new(
            status.as_u16(),
            Headers::from_header_map(&headers),
            body.clone(),
            self.default_ttl,
        );
        info!(cache_key = %ctx.cache_key, status = status.as_u16(), "Storing response");
        self.storer.set(&ctx.cache_key, entry).await;
        self.metrics.record_store_attempt();

        Ok(buffered_response(status, headers, body))
    }
}

// == Proxy Handler ==
/// Fallback handler for every proxied request.
///
/// Non-GET requests are forwarded and relayed without touching the cache.
pub async fn proxy_handler(State(state): State<ProxyState>, req: Request) -> Result<Response> {
    if req.method() != Method::GET {
        let upstream = state.forward(req).await?;
        return Ok(stream_response(upstream));
    }

    let cache_key = key::generate(&req);
    let path = req.uri().path().to_string();

    if let Some(entry) = state.storer.get(&cache_key).await {
        info!(cache_key = %cache_key, path = %path, "Cache hit");
        state.metrics.record_hit();
        return cached_response(&entry);
    }

    info!(cache_key = %cache_key, path = %path, "Cache miss");
    state.metrics.record_miss();

    let ctx = CacheContext { cache_key };
    let upstream = state.forward(req).await?;
    state.intercept(upstream, Some(&ctx)).await
}

/// Replays a stored response: status, every header value in order, body.
fn cached_response(entry: &CacheEntry) -> Result<Response> {
    let status = StatusCode::from_u16(entry.status_code)
        .map_err(|err| ProxyError::Internal(format!("stored status is invalid: {err}")))?;

    let mut response = Response::new(Body::from(entry.body.clone()));
    *response.status_mut() = status;
    entry.headers.write_to(response.headers_mut());
    Ok(response)
}

/// True when any `Cache-Control` value carries the `no-store` directive.
fn has_no_store(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::CACHE_CONTROL)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|directive| directive.trim().eq_ignore_ascii_case("no-store"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use bytes::Bytes;

    #[test]
    fn test_has_no_store() {
        let mut headers = HeaderMap::new();
        assert!(!has_no_store(&headers));

        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=60"));
        assert!(!has_no_store(&headers));

        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("private, No-Store"));
        assert!(has_no_store(&headers));

        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        assert!(has_no_store(&headers));
    }

    #[test]
    fn test_has_no_store_checks_every_value() {
        let mut headers = HeaderMap::new();
        headers.append(header::CACHE_CONTROL, HeaderValue::from_static("public"));
        headers.append(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        assert!(has_no_store(&headers));
    }

    #[test]
    fn test_has_no_store_ignores_lookalikes() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store-ish, no-cache"));
        assert!(!has_no_store(&headers));
    }

    #[test]
    fn test_cached_response_replays_entry() {
        let mut stored = Headers::new();
        stored.append("x-multi", "a");
        stored.append("x-multi", "b");
        stored.append("content-type", "text/plain");
        let entry = CacheEntry::new(
            200,
            stored,
            Bytes::from_static(b"payload"),
            Duration::from_secs(60),
        );

        let response = cached_response(&entry).unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let values: Vec<_> = response.headers().get_all("x-multi").iter().collect();
        assert_eq!(values, ["a", "b"]);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    }
}
