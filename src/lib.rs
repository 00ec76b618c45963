//! Caching Proxy - An HTTP reverse proxy with a transparent response cache
//!
//! Successful GET responses from a single origin are stored in an in-memory
//! LRU or in Redis and replayed on repeat requests.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod proxy;

pub use cache::{init_storer, Storer};
pub use config::Config;
pub use metrics::ProxyMetrics;
pub use proxy::{ProxyState, Upstream};
