//! Proxy Metrics Module
//!
//! Prometheus collectors for cache hits, misses, store attempts, upstream
//! errors and request latency, plus a JSON snapshot of the same values.

use std::time::Duration;

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use serde::Serialize;

/// Content type of the Prometheus text exposition served on `/metrics`.
pub const METRICS_CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

// == Proxy Metrics ==
/// Collectors registered in a private registry, updated from request handlers.
pub struct ProxyMetrics {
    registry: Registry,
    cache_hits: IntCounter,
    cache_misses: IntCounter,
    cache_store_attempts: IntCounter,
    upstream_errors: IntCounter,
    latency: Histogram,
}

impl ProxyMetrics {
    /// Creates and registers every collector.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let cache_hits = counter(
            &registry,
            "proxy_cache_hits_total",
            "The total number of cache hits",
        )?;
        let cache_misses = counter(
            &registry,
            "proxy_cache_misses_total",
            "The total number of cache misses",
        )?;
        let cache_store_attempts = counter(
            &registry,
            "proxy_cache_store_attempts_total",
            "Cacheable responses handed to the cache backend",
        )?;
        let upstream_errors = counter(
            &registry,
            "proxy_upstream_errors_total",
            "Requests the origin could not answer",
        )?;

        // Ten buckets of 100ms, 0.1s to 1.0s
        let latency = Histogram::with_opts(
            HistogramOpts::new(
                "proxy_request_duration_seconds",
                "A histogram of the request latency",
            )
            .buckets(prometheus::linear_buckets(0.1, 0.1, 10)?),
        )?;
        registry.register(Box::new(latency.clone()))?;

        Ok(Self {
            registry,
            cache_hits,
            cache_misses,
            cache_store_attempts,
            upstream_errors,
            latency,
        })
    }

    pub fn record_hit(&self) {
        self.cache_hits.inc();
    }

    pub fn record_miss(&self) {
        self.cache_misses.inc();
    }

    /// Counts a response handed to the backend. Backends may still decline it.
    pub fn record_store_attempt(&self) {
        self.cache_store_attempts.inc();
    }

    pub fn record_upstream_error(&self) {
        self.upstream_errors.inc();
    }

    /// Counts a finished request and its latency.
    pub fn record_request(&self, latency: Duration) {
        self.latency.observe(latency.as_secs_f64());
    }

    // == Exposition ==
    /// Renders every collector in the Prometheus text format.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }

    // == Snapshot ==
    /// Returns a point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.latency.get_sample_count();
        let cache_hits = self.cache_hits.get();
        let cache_misses = self.cache_misses.get();

        let lookups = cache_hits + cache_misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            cache_hits as f64 / lookups as f64
        };
        let avg_latency_ms = if requests == 0 {
            0.0
        } else {
            self.latency.get_sample_sum() / requests as f64 * 1000.0
        };

        MetricsSnapshot {
            requests,
            cache_hits,
            cache_misses,
            cache_store_attempts: self.cache_store_attempts.get(),
            upstream_errors: self.upstream_errors.get(),
            hit_rate,
            avg_latency_ms,
        }
    }
}

fn counter(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntCounter> {
    let counter = IntCounter::new(name, help)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

// == Metrics Snapshot ==
/// Serializable view of [`ProxyMetrics`], served on the admin `/stats` route.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_store_attempts: u64,
    pub upstream_errors: u64,
    /// hits / (hits + misses), 0.0 before the first lookup
    pub hit_rate: f64,
    pub avg_latency_ms: f64,
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let snapshot = ProxyMetrics::new().unwrap().snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
    }

    #[test]
    fn test_hit_rate_all_hits() {
        let metrics = ProxyMetrics::new().unwrap();
        metrics.record_hit();
        metrics.record_hit();
        assert_eq!(metrics.snapshot().hit_rate, 1.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let metrics = ProxyMetrics::new().unwrap();
        metrics.record_hit();
        metrics.record_miss();
        assert_eq!(metrics.snapshot().hit_rate, 0.5);
    }

    #[test]
    fn test_record_store_attempt_and_upstream_error() {
        let metrics = ProxyMetrics::new().unwrap();
        metrics.record_store_attempt();
        metrics.record_upstream_error();
        metrics.record_upstream_error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cache_store_attempts, 1);
        assert_eq!(snapshot.upstream_errors, 2);
    }

    #[test]
    fn test_average_latency() {
        let metrics = ProxyMetrics::new().unwrap();
        metrics.record_request(Duration::from_millis(10));
        metrics.record_request(Duration::from_millis(30));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests, 2);
        assert!((snapshot.avg_latency_ms - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_render_exposes_counters_and_histogram() {
        let metrics = ProxyMetrics::new().unwrap();
        metrics.record_hit();
        metrics.record_request(Duration::from_millis(150));

        let text = metrics.render().unwrap();
        assert!(text.contains("proxy_cache_hits_total 1"));
        assert!(text.contains("proxy_cache_misses_total 0"));
        assert!(text.contains("proxy_request_duration_seconds_count 1"));
        // 150ms lands in the 0.2 bucket but not the 0.1 one
        assert!(text.contains("proxy_request_duration_seconds_bucket{le=\"0.1\"} 0"));
        assert!(text.contains("proxy_request_duration_seconds_bucket{le=\"0.2\"} 1"));
    }

    #[test]
    fn test_registries_are_independent() {
        let first = ProxyMetrics::new().unwrap();
        let second = ProxyMetrics::new().unwrap();
        first.record_miss();

        assert_eq!(first.snapshot().cache_misses, 1);
        assert_eq!(second.snapshot().cache_misses, 0);
    }
}
