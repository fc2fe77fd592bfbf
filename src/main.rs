//! Offline Gateway - an offline-first caching HTTP gateway
//!
//! Fronts an upstream origin with service-worker style caching strategies,
//! a versioned cache lifecycle and a durable background-sync queue.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use offline_gateway::api::create_router;
use offline_gateway::http::{Fetcher, HttpFetcher};
use offline_gateway::sync::{MutationStore, SqliteMutationStore};
use offline_gateway::{spawn_cleanup_task, spawn_sync_task, AppState, Config};

/// Main entry point for the offline gateway.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the upstream fetcher and open the mutation queue
/// 4. Run the install transition (precache the static manifest)
/// 5. Run the activate transition (delete previous cache generations)
/// 6. Start background TTL sweep and sync tasks
/// 7. Start HTTP server on configured port
/// 8. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offline_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Offline Gateway");

    // Load configuration from environment variables
    let config = Config::from_env();
    info!(
        "Configuration loaded: upstream={}, version={}, port={}, cleanup_interval={}s, sync_interval={}s",
        config.upstream_url, config.version, config.server_port, config.cleanup_interval,
        config.sync_interval
    );

    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(
        &config.upstream_url,
        Duration::from_secs(config.fetch_timeout),
    )?);
    let mutations: Arc<dyn MutationStore> =
        Arc::new(SqliteMutationStore::open(&config.queue_db_path)?);

    let state = AppState::from_config(&config, fetcher.clone(), mutations.clone());

    // All-or-nothing manifest precache; a failed install leaves the process
    // in a failed state until the next deployment (restart) retries it
    if let Err(err) = state.install().await {
        error!(error = %err, "Install failed, exiting");
        return Err(err.into());
    }
    state.activate().await?;
    info!("Cache generations installed and activated");

    // Start background tasks
    let cleanup_handle = spawn_cleanup_task(
        state.registry.clone(),
        state.stats.clone(),
        state.dynamic_bucket.clone(),
        Duration::from_secs(config.dynamic_max_age),
        Duration::from_secs(config.cleanup_interval),
    );
    let sync_handle = spawn_sync_task(
        mutations,
        fetcher,
        Duration::from_secs(config.sync_interval),
    );
    info!("Background cleanup and sync tasks started");

    // Create router with control surface and proxy fallback
    let app = create_router(state);

    // Bind to configured port
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Gateway listening on http://{}", addr);

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle, sync_handle))
        .await?;

    info!("Gateway shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the background tasks and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: JoinHandle<()>, sync_handle: JoinHandle<()>) {
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

    // Abort the background tasks
    cleanup_handle.abort();
    sync_handle.abort();
    warn!("Background tasks aborted");
}
