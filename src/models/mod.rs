//! Response models for the health and admin endpoints.

pub mod responses;

pub use responses::HealthResponse;
