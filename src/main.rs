//! Cloud Cache - composition root
//!
//! Builds the single cache manager, attaches the durable store when a
//! storage path is configured and serves the inspection API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cloud_cache::api::create_router;
use cloud_cache::durable::FileStore;
use cloud_cache::manager::TracingObserver;
use cloud_cache::{spawn_sweep_task, AppState, CacheManager, Config};

/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the durable store, if any, and build the cache manager
/// 4. Start the background expiry sweep
/// 5. Serve the inspection API until SIGINT/SIGTERM
/// 6. Release the memory tiers on shutdown
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cloud_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cloud Cache");

    let config = Config::from_env().context("failed to load configuration")?;
    info!(
        enabled = config.cache.enabled,
        port = config.server_port,
        sweep_interval = config.sweep_interval,
        storage_path = ?config.cache.storage_path,
        "Configuration loaded"
    );

    let mut builder =
        CacheManager::builder(config.cache.clone()).observer(Arc::new(TracingObserver));
    if let Some(path) = &config.cache.storage_path {
        let store = FileStore::open(path)
            .await
            .with_context(|| format!("failed to open durable store at {}", path.display()))?;
        builder = builder.durable_store(Arc::new(store));
    }
    let manager = Arc::new(builder.build());

    let sweep_handle = (config.sweep_interval > 0)
        .then(|| spawn_sweep_task(manager.clone(), config.sweep_interval));

    let app = create_router(AppState::new(manager.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sweep_handle))
        .await
        .context("server error")?;

    manager.cleanup().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops the sweep.
async fn shutdown_signal(sweep_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
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

    if let Some(handle) = sweep_handle {
        handle.abort();
        warn!("Expiry sweep task aborted");
    }
}
