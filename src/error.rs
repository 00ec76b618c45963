//! Error types for the caching proxy
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Config Error Enum ==
/// Startup configuration problems. Always fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },

    /// The upstream target is not an absolute http(s) URL
    #[error("Invalid upstream target {target:?}: {reason}")]
    InvalidTarget { target: String, reason: String },

    /// The remote backend address cannot be turned into a connection URL
    #[error("Invalid remote backend address {0:?}")]
    InvalidBackendAddress(String),
}

// == Cache Error Enum ==
/// Failures inside a cache backend.
///
/// These are logged and swallowed: a backend failure degrades to a miss or a
/// skipped store, never to a failed response.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Entry could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote backend transport or protocol failure
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

// == Proxy Error Enum ==
/// Per-request failures that surface to the client.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// The inbound request body could not be read
    #[error("Failed to read request body: {0}")]
    RequestBody(String),

    /// The origin could not be reached
    #[error("Upstream request failed: {0}")]
    Upstream(#[source] reqwest::Error),

    /// The origin answered but its body could not be read
    #[error("Failed to read upstream response body: {0}")]
    UpstreamBody(#[source] reqwest::Error),

    /// The response could not be assembled
    #[error("Internal error: {0}")]
    Internal(String),

    /// Metrics could not be gathered or encoded
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

// == IntoResponse Implementation ==
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::RequestBody(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) | ProxyError::UpstreamBody(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Internal(_) | ProxyError::Metrics(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for request handling.
pub type Result<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_error_maps_to_500() {
        let response = ProxyError::Internal("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_metrics_error_maps_to_500() {
        let err = ProxyError::from(prometheus::Error::Msg("encode".to_string()));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::InvalidValue {
            name: "LRU_SIZE",
            value: "ten".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid value for LRU_SIZE: \"ten\"");
        assert_eq!(
            ConfigError::Missing("PROXY_TARGET").to_string(),
            "Missing required setting: PROXY_TARGET"
        );
    }
}
