//! Storefront Cache - admin server
//!
//! Serves the cache administration API and runs the background sweepers.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_cache::{create_router, spawn_cleanup_task, AppState, CleanupHandle, Config};

/// Main entry point for the storefront cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Create the stores and the deduplicator
/// 4. Start one background sweeper per store
/// 5. Serve the admin API until SIGINT/SIGTERM, then stop the sweepers
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Storefront Cache Server");

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: default_ttl={}ms, product_ttl={}ms, user_ttl={}ms, dedup_window={}ms, port={}",
        config.default_ttl_ms,
        config.product_ttl_ms,
        config.user_ttl_ms,
        config.dedup_window_ms,
        config.server_port
    );

    let state = AppState::from_config(&config)?;
    info!("Cache stores initialized");

    let cache_interval = Duration::from_millis(config.cache_cleanup_interval_ms);
    let cleanup_handles = vec![
        spawn_cleanup_task(state.general.clone(), cache_interval, "general"),
        spawn_cleanup_task(state.products.clone(), cache_interval, "products"),
        spawn_cleanup_task(state.users.clone(), cache_interval, "users"),
        spawn_cleanup_task(state.responses.clone(), cache_interval, "responses"),
        spawn_cleanup_task(
            state.deduplicator.clone(),
            Duration::from_millis(config.dedup_cleanup_interval_ms),
            "deduplicator",
        ),
    ];
    info!("{} background cleanup tasks started", cleanup_handles.len());

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handles))
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then cancels the sweepers.
async fn shutdown_signal(cleanup_handles: Vec<CleanupHandle>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
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

    for handle in &cleanup_handles {
        handle.cancel();
    }
}
