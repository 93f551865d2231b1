use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use traffic_log_buffered_api::{
    app::build_router, config::AppConfig, state::AppState,
};
use traffic_log_core::buffer::redis::RedisBufferStore;
use traffic_log_core::pipeline::LogPipeline;
use traffic_log_core::preload::preload_cache;
use traffic_log_core::store::postgres::{PostgresLogStore, run_migrations};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to postgres")?;
    run_migrations(&pool)
        .await
        .context("failed to run migrations")?;
    let store = PostgresLogStore::new(pool);

    let buffer = Arc::new(
        RedisBufferStore::connect(&config.redis_url)
            .await
            .context("failed to connect to redis")?,
    );

    // Serving must not start before the cache and id range are primed; a
    // preload failure is fatal to startup.
    let range = preload_cache(&store, buffer.as_ref())
        .await
        .context("cache preload failed")?;

    let pipeline = Arc::new(LogPipeline::new(buffer, range));
    let state = AppState::new(pipeline);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(
        bind_addr = %config.bind_addr,
        min_id = range.min_id,
        max_id = range.max_id,
        "buffered API started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("traffic_log_buffered_api=debug,traffic_log_core=debug,tower_http=info")
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
