use std::sync::Arc;

use axum::body::Bytes;
use tokio::sync::RwLock;

use crate::db::{load_theme, save_theme, ThemeStore};
use crate::error::{AppError, AppResult};
use crate::models::{ThemeData, ThemeUpdate};
use crate::services::ThemeGenerator;

/// Shared application state
///
/// Owns the single active theme and the store it is persisted to. Built once
/// at startup and handed to every handler.
#[derive(Clone)]
pub struct AppState {
    current: Arc<RwLock<ThemeData>>,
    store: Arc<dyn ThemeStore>,
    generator: ThemeGenerator,
}

impl AppState {
    /// Restores the saved theme from `store`, falling back to the default
    pub async fn init(store: Arc<dyn ThemeStore>, generator: ThemeGenerator) -> Self {
        let theme = match load_theme(store.as_ref()).await {
            Some(theme) => {
                tracing::info!(store = store.name(), "Restored saved theme");
                theme
            }
            None => {
                tracing::info!(store = store.name(), "Using default theme");
                ThemeData::default()
            }
        };

        Self {
            current: Arc::new(RwLock::new(theme)),
            store,
            generator,
        }
    }

    /// Snapshot of the active theme
    pub async fn current(&self) -> ThemeData {
        self.current.read().await.clone()
    }

    /// Makes `theme` the active theme and persists it.
    ///
    /// Persistence failures are logged; the in-memory theme still changes.
    pub async fn install(&self, theme: ThemeData) {
        let mut current = self.current.write().await;
        *current = theme;
        save_theme(self.store.as_ref(), &current).await;
    }

    /// Restores the stock theme
    pub async fn reset(&self) -> ThemeData {
        let theme = ThemeData::default();
        self.install(theme.clone()).await;
        theme
    }

    /// Applies a partial edit to the active theme
    pub async fn apply_update(&self, update: &ThemeUpdate) -> AppResult<ThemeData> {
        let mut current = self.current.write().await;
        let updated = update.apply(&current)?;
        *current = updated.clone();
        save_theme(self.store.as_ref(), &current).await;
        Ok(updated)
    }

    /// Generates a theme from image bytes and installs it.
    ///
    /// On failure the active theme is left untouched.
    pub async fn generate_from_image(&self, image: Bytes) -> AppResult<ThemeData> {
        if image.is_empty() {
            return Err(AppError::InvalidInput("Image upload is empty".to_string()));
        }

        let generator = self.generator;
        let theme = tokio::task::spawn_blocking(move || generator.generate(&image))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;

        self.install(theme.clone()).await;
        Ok(theme)
    }
}
