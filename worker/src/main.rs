mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use traffic_log_core::buffer::redis::RedisBufferStore;
use traffic_log_core::drain::{spawn_ingestion_drain, spawn_update_drain};
use traffic_log_core::store::postgres::{PostgresLogStore, run_migrations};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::WorkerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let config = WorkerConfig::from_env().context("failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to postgres")?;
    run_migrations(&pool)
        .await
        .context("failed to run migrations")?;

    let store = Arc::new(PostgresLogStore::new(pool));
    let buffer = Arc::new(
        RedisBufferStore::connect(&config.redis_url)
            .await
            .context("failed to connect to redis")?,
    );

    let ingestion = spawn_ingestion_drain(buffer.clone(), store.clone(), config.drain_config());
    let update = spawn_update_drain(buffer, store, config.drain_config());

    info!(
        batch_size = config.batch_size,
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        "drain workers running"
    );

    shutdown_signal().await;
    info!("shutting down drain workers");

    if let Err(err) = ingestion.stop().await {
        error!(error = %err, "ingestion drain worker did not stop cleanly");
    }
    if let Err(err) = update.stop().await {
        error!(error = %err, "update drain worker did not stop cleanly");
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("traffic_log_worker=debug,traffic_log_core=debug")
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install ctrl+c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install sigterm handler");
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
}
