//! Caching Proxy - An HTTP reverse proxy with a transparent response cache
//!
//! Forwards traffic to a single origin and replays successful GET responses
//! from an LRU or Redis cache.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use caching_proxy::api::{create_admin_router, create_router};
use caching_proxy::{init_storer, Config, ProxyMetrics, ProxyState, Upstream};

/// Main entry point for the caching proxy.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Connect the configured cache backend
/// 4. Start the admin server (health, stats, metrics)
/// 5. Start the proxy server on the configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "caching_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting caching proxy");

    let config = Config::from_env().context("failed to load configuration")?;
    info!(
        upstream = %config.target,
        port = config.server_port,
        admin_port = config.admin_port,
        default_ttl = config.default_ttl,
        "Configuration loaded"
    );

    let storer = init_storer(&config.backend).await?;
    let metrics = Arc::new(ProxyMetrics::new().context("failed to register metrics")?);
    let upstream =
        Upstream::new(config.target.clone()).context("failed to build upstream client")?;
    let state = ProxyState::new(storer, upstream, config.default_ttl(), metrics.clone());

    // Admin server
    let admin_addr = SocketAddr::from(([0, 0, 0, 0], config.admin_port));
    let admin_listener = TcpListener::bind(admin_addr)
        .await
        .with_context(|| format!("failed to bind admin listener on {admin_addr}"))?;
    info!("Admin server listening on http://{}", admin_addr);
    let admin_handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(admin_listener, create_admin_router(metrics)).await {
            error!(error = %err, "Admin server failed");
        }
    });

    // Proxy server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind proxy listener on {addr}"))?;
    info!("Proxy listening on http://{} -> {}", addr, config.target);

    axum::serve(
        listener,
        create_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("proxy server failed")?;

    admin_handle.abort();
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
