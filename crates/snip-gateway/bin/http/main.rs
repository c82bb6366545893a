mod cli;
mod telemetry;

use std::future::IntoFuture;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use snip_allocator::{AllocationService, AllocatorSettings};
use snip_core::{Allocator, MappingStore};
use snip_gateway::{App, AppState};
use snip_generator::HashedUuidGenerator;
use snip_storage::{InMemoryStore, MySqlStore, SqliteStore};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{Environment, StorageBackendArg, CLI};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv()?;

    let config = CLI::try_parse()?;
    let (env, unknown_env) = Environment::resolve(&config.env);
    telemetry::init(env, &config.log)?;

    if let Some(raw) = unknown_env {
        warn!(value = %raw, fallback = %env, "invalid environment, using fallback");
    }

    info!(
        listen_addr = %config.listen_addr,
        env = %env,
        storage_backend = %config.storage,
        max_attempts = config.max_attempts,
        "starting snip gateway"
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    match config.storage {
        StorageBackendArg::InMemory => {
            serve(&config, Arc::new(InMemoryStore::new()), shutdown).await
        }
        StorageBackendArg::Sqlite => {
            let store = SqliteStore::connect(&config.sqlite_url, config.max_db_connections)
                .await
                .context("failed to open sqlite database")?;
            store.migrate().await.context("failed to migrate sqlite schema")?;
            serve(&config, Arc::new(store), shutdown).await
        }
        StorageBackendArg::Mysql => {
            let mysql_dsn = config
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when storage backend is mysql")?;
            let store = MySqlStore::connect(mysql_dsn, config.max_db_connections)
                .await
                .context("failed to connect to mysql")?;
            store.migrate().await.context("failed to migrate mysql schema")?;
            serve(&config, Arc::new(store), shutdown).await
        }
    }
}

/// A missing `.env` is fine; a malformed one is fatal.
fn load_dotenv() -> anyhow::Result<()> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(err).context("failed to load .env"),
    }
}

async fn serve<S: MappingStore>(
    config: &CLI,
    store: Arc<S>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let settings = AllocatorSettings::builder()
        .max_attempts(config.max_attempts)
        .build();

    let allocator: Arc<dyn Allocator> = Arc::new(AllocationService::with_shared_store(
        Arc::clone(&store),
        HashedUuidGenerator::new(),
        settings,
    )?);

    let state = AppState::builder()
        .allocator(allocator)
        .base_url(config.public_base_url.clone())
        .request_timeout(config.request_timeout())
        .shutdown(shutdown.clone())
        .build();

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!(listen_addr = %listener.local_addr()?, "listening");

    let mut server = tokio::spawn(
        axum::serve(listener, App::router(state))
            .with_graceful_shutdown(shutdown.clone().cancelled_owned())
            .into_future(),
    );

    tokio::select! {
        result = &mut server => result??,
        _ = shutdown.cancelled() => {
            match tokio::time::timeout(config.shutdown_timeout(), &mut server).await {
                Ok(result) => result??,
                Err(_) => {
                    warn!("graceful shutdown timed out, aborting open connections");
                    server.abort();
                }
            }
        }
    }

    store.close().await.context("failed to close store")?;
    info!("server stopped");
    Ok(())
}

async fn cancel_on_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
    shutdown.cancel();
}
