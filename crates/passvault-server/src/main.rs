//! `PassVault` server entry point.
//!
//! Loads configuration, bootstraps the secret store and vault service, then
//! starts the Axum HTTP server with graceful shutdown.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use passvault_server::config::{ServerConfig, StorageBackendType};
use passvault_server::routes;
use passvault_server::state::AppState;
use passvault_storage::{MemoryStore, SecretStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(
        storage = config.storage_backend.name(),
        key_bits = config.encryption_key.len() * 8,
        "PassVault starting"
    );

    let store = open_store(&config).await?;
    let state = AppState::new(store, &config.encryption_key)
        .context("failed to initialise cipher")?
        .with_identity_header(config.identity_header.clone())
        .with_max_backup_bytes(config.max_backup_bytes);

    let app = routes::build_router(Arc::new(state));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "PassVault server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("PassVault server stopped");
    Ok(())
}

async fn open_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn SecretStore>> {
    let store: Arc<dyn SecretStore> = match &config.storage_backend {
        StorageBackendType::Memory => {
            info!("using in-memory storage (data will not persist)");
            Arc::new(MemoryStore::new())
        }
        #[cfg(feature = "postgres-backend")]
        StorageBackendType::Postgres { url } => {
            info!(url = %"[redacted]", "using PostgreSQL storage");
            Arc::new(
                passvault_storage::PostgresStore::connect(url)
                    .await
                    .context("failed to connect to PostgreSQL storage")?,
            )
        }
        #[cfg(not(feature = "postgres-backend"))]
        StorageBackendType::Postgres { .. } => {
            anyhow::bail!(
                "PostgreSQL backend requested but feature 'postgres-backend' is not enabled"
            );
        }
    };
    Ok(store)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
