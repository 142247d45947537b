use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use media_tracker_theme::{
    api::{create_router, AppState},
    config::Config,
    db::{create_redis_client, MemoryStore, RedisStore, StoreWriterHandle, ThemeStore},
    services::ThemeGenerator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("media_tracker_theme=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let (store, writer) = open_store(&config)?;
    let state = AppState::init(store, ThemeGenerator::default()).await;
    let app = create_router(state, config.max_upload_bytes);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Theme service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = writer {
        writer.shutdown().await;
    }

    tracing::info!("Theme service stopped");
    Ok(())
}

/// Picks the theme store: Redis when configured, otherwise in-memory
fn open_store(config: &Config) -> anyhow::Result<(Arc<dyn ThemeStore>, Option<StoreWriterHandle>)> {
    match &config.redis_url {
        Some(redis_url) => {
            let client = create_redis_client(redis_url)?;
            let (store, writer) = RedisStore::new(client);
            tracing::info!("Persisting theme to Redis");
            Ok((Arc::new(store), Some(writer)))
        }
        None => {
            let store = match config.memory_quota_bytes {
                Some(quota) => MemoryStore::with_quota(quota),
                None => MemoryStore::new(),
            };
            tracing::warn!("REDIS_URL not set, theme will not survive restarts");
            Ok((Arc::new(store), None))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
