//! Proxy Module
//!
//! Reverse proxy with a transparent response cache in front of one origin.
//!
//! # Flow
//! - Non-GET: forwarded and relayed, cache never consulted
//! - GET hit: stored response replayed, origin not contacted
//! - GET miss: forwarded; a `200 OK` without `no-store` is buffered and stored

pub mod handler;
pub mod key;
pub mod upstream;

pub use handler::{proxy_handler, CacheContext, ProxyState};
pub use upstream::Upstream;
