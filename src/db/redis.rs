use redis::AsyncCommands;
use redis::Client;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::db::ThemeStore;
use crate::error::{AppError, AppResult};

/// Creates a Redis client for theme storage
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Queued write for the background writer
struct StoreWriteMessage {
    key: String,
    value: String,
}

/// Redis-backed theme store
///
/// Reads go straight to Redis. Writes are queued to a background task so a
/// slow or unavailable Redis never holds up a theme change; failed writes are
/// logged and dropped.
#[derive(Clone)]
pub struct RedisStore {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<StoreWriteMessage>,
}

/// Handle for stopping the background writer on process exit
pub struct StoreWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl StoreWriterHandle {
    /// Signals the writer to stop and waits until queued writes are flushed
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Theme store writer shutdown signal sent");

        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Theme store writer task failed");
        }
    }
}

impl RedisStore {
    /// Creates the store and spawns its background writer
    pub fn new(redis_client: Client) -> (Self, StoreWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        let task = tokio::spawn(async move {
            Self::writer_task(client, write_rx, shutdown_rx).await;
        });

        let store = Self {
            redis_client,
            write_tx,
        };

        (store, StoreWriterHandle { shutdown_tx, task })
    }

    async fn writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<StoreWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Theme store writer started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = Self::write_to_redis(&client, msg).await {
                        tracing::error!(error = %e, "Failed to write theme to Redis");
                    }
                }
                _ = shutdown_rx.recv() => {
                    // Stop accepting writes, then drain what is already queued
                    write_rx.close();
                    let mut flushed = 0;
                    while let Some(msg) = write_rx.recv().await {
                        match Self::write_to_redis(&client, msg).await {
                            Ok(()) => flushed += 1,
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to flush theme write during shutdown")
                            }
                        }
                    }

                    tracing::info!(flushed, "Theme store writer stopped");
                    break;
                }
            }
        }
    }

    async fn write_to_redis(client: &Client, msg: StoreWriteMessage) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set(msg.key, msg.value).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ThemeStore for RedisStore {
    async fn read(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn write(&self, key: &str, value: String) -> AppResult<()> {
        let msg = StoreWriteMessage {
            key: key.to_string(),
            value,
        };

        self.write_tx
            .send(msg)
            .map_err(|_| AppError::Internal("Theme store writer has stopped".to_string()))
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

// These tests need a running Redis: REDIS_URL=redis://localhost:6379 cargo test -- --ignored
