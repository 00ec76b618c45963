//! API Handlers
//!
//! Health, stats and metrics endpoints. Everything else is handled by the proxy.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::Result;
use crate::metrics::{MetricsSnapshot, ProxyMetrics, METRICS_CONTENT_TYPE};
use crate::models::HealthResponse;

/// Handler for GET /healthz
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Handler for GET /stats
///
/// Returns a snapshot of the proxy counters.
pub async fn stats_handler(State(metrics): State<Arc<ProxyMetrics>>) -> Json<MetricsSnapshot> {
    Json(metrics.snapshot())
}

/// Handler for GET /metrics
///
/// Prometheus scrape endpoint.
pub async fn metrics_handler(
    State(metrics): State<Arc<ProxyMetrics>>,
) -> Result<impl IntoResponse> {
    let body = metrics.render()?;
    Ok(([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], body))
}

/// Middleware recording request count and latency.
pub async fn track_latency(
    State(metrics): State<Arc<ProxyMetrics>>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let response = next.run(req).await;
    metrics.record_request(start.elapsed());
    response
}
