//! # TaskBoard API Server
//!
//! Serves the company / board / column / task hierarchy over HTTP with
//! hierarchical role-based access control.
//!
//! ## Startup
//!
//! 1. Load configuration from the environment
//! 2. Connect to PostgreSQL and run migrations
//! 3. Select the cache backend (Redis, falling back to in-process memory)
//! 4. Serve until Ctrl-C or SIGTERM, then drain in-flight requests
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskboard-api
//! ```

use std::sync::Arc;

use taskboard_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskboard_shared::cache::{
    memory::MemoryCache, redis::RedisCache, CacheBackend, CacheBackendKind, CacheConfig,
    CacheGateway,
};
use taskboard_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool, DatabaseConfig},
};
use taskboard_shared::events::TracingPublisher;
use taskboard_shared::redis::{RedisClient, RedisConfig};
use taskboard_shared::services::ServiceContext;
use taskboard_shared::store::postgres::PgStore;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "taskboard_api=debug,taskboard_shared=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "TaskBoard API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;
    run_migrations(&pool).await?;

    let backend = cache_backend(&config.cache).await;
    let cache = CacheGateway::with_config(backend, &config.cache);
    tracing::info!(backend = cache.backend_name(), "Cache ready");

    let ctx = ServiceContext::new(
        Arc::new(PgStore::new(pool.clone())),
        cache,
        Arc::new(TracingPublisher),
    );

    let shutdown = CancellationToken::new();
    let state = AppState::new(pool.clone(), ctx, config.clone(), shutdown.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!("Server listening on http://{}", config.bind_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

/// Connects the configured cache backend
///
/// A Redis backend that cannot be reached at startup is replaced by the
/// in-process cache so the server still starts.
async fn cache_backend(config: &CacheConfig) -> Arc<dyn CacheBackend> {
    if config.backend == CacheBackendKind::Memory {
        return Arc::new(MemoryCache::new());
    }

    let connected = match RedisConfig::from_env() {
        Ok(redis_config) => RedisClient::new(redis_config).await,
        Err(e) => Err(e),
    };

    match connected {
        Ok(client) => Arc::new(RedisCache::new(client, config.namespace.clone())),
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable, falling back to in-memory cache");
            Arc::new(MemoryCache::new())
        }
    }
}

/// Resolves on Ctrl-C or SIGTERM and cancels every in-flight request token
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received, draining requests...");
    shutdown.cancel();
}
