//! API Module
//!
//! Routing for the proxy listener and the admin listener.
//!
//! # Endpoints
//! - `GET /healthz` - Health check (both listeners)
//! - `GET /stats` - Proxy counters (admin listener)
//! - anything else on the proxy listener - Cached reverse proxy

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::{create_admin_router, create_router};
