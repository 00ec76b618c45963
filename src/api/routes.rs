//! API Routes
//!
//! Builds the proxy router and the admin router.

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{health_handler, metrics_handler, stats_handler, track_latency};
use crate::metrics::ProxyMetrics;
use crate::proxy::{proxy_handler, ProxyState};

/// Creates the public router.
///
/// # Endpoints
/// - `GET /healthz` - Health check, never proxied
/// - everything else - Proxied to the origin through the cache
///
/// # Middleware
/// - Latency: counts proxied requests and their duration
/// - Tracing: logs all requests
pub fn create_router(state: ProxyState) -> Router {
    let proxy = Router::new()
        .fallback(proxy_handler)
        .layer(middleware::from_fn_with_state(
            state.metrics().clone(),
            track_latency,
        ))
        .with_state(state);

    Router::new()
        .route("/healthz", get(health_handler))
        .merge(proxy)
        .layer(TraceLayer::new_for_http())
}

/// Creates the admin router.
///
/// # Endpoints
/// - `GET /healthz` - Health check
/// - `GET /stats` - Proxy counters as JSON
/// - `GET /metrics` - Prometheus scrape endpoint
pub fn create_admin_router(metrics: Arc<ProxyMetrics>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(metrics)
}
