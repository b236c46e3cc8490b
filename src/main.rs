//! Pooled KV - A key-value server with a read cache and a pooled durable store

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pooled_kv::storage::MemoryTable;
use pooled_kv::{create_router, AppState, Config, KvService};

/// Main entry point for the key-value server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the durable table and the connection pool
/// 4. Preload the cache from the table
/// 5. Serve HTTP on a runtime whose blocking pool runs service calls
/// 6. Close the pool after graceful shutdown on SIGINT/SIGTERM
fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pooled_kv=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Pooled KV Server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: cache_capacity={}, pool_size={}, worker_threads={}, port={}, data_file={:?}, acquire_timeout_ms={:?}",
        config.cache_capacity,
        config.pool_size,
        config.worker_threads,
        config.server_port,
        config.data_file,
        config.acquire_timeout_ms
    );

    let table = match &config.data_file {
        Some(path) => MemoryTable::open(path)
            .with_context(|| format!("failed to open table at {}", path.display()))?,
        None => MemoryTable::new(),
    };

    let service = KvService::connect(&table, config.cache_capacity, config.pool_size)
        .context("failed to create connection pool")?
        .with_acquire_timeout(config.acquire_timeout());

    if let Err(err) = service.warm_load(config.cache_capacity) {
        warn!("Cache preload skipped: {}", err);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .max_blocking_threads(config.worker_threads)
        .build()
        .context("failed to build runtime")?;

    let service = Arc::new(service);
    runtime.block_on(serve(config.server_port, Arc::clone(&service)))?;
    drop(runtime);

    match Arc::try_unwrap(service) {
        Ok(service) => service.shutdown(),
        Err(_) => warn!("Service still referenced at exit; connections close on drop"),
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn serve(port: u16, service: Arc<KvService<MemoryTable>>) -> anyhow::Result<()> {
    let app = create_router(AppState::from_shared(service));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
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
}
