use crate::{error::AppResult, models::ThemeData};

/// Key under which the active theme is persisted
pub const THEME_STORAGE_KEY: &str = "media-tracker-theme";

/// Key-value storage backing theme persistence
///
/// Stores hold opaque strings; serialization lives in [`load_theme`] and
/// [`save_theme`] so every backend shares the same record format.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ThemeStore: Send + Sync {
    /// Reads the raw value stored under `key`
    async fn read(&self, key: &str) -> AppResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value
    async fn write(&self, key: &str, value: String) -> AppResult<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Restores the saved theme.
///
/// Any read or parse failure is logged and treated as "no saved theme".
pub async fn load_theme(store: &dyn ThemeStore) -> Option<ThemeData> {
    let raw = match store.read(THEME_STORAGE_KEY).await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            tracing::debug!(store = store.name(), "No saved theme");
            return None;
        }
        Err(e) => {
            tracing::error!(store = store.name(), error = %e, "Failed to load saved theme");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(theme) => Some(theme),
        Err(e) => {
            tracing::error!(store = store.name(), error = %e, "Saved theme is unreadable");
            None
        }
    }
}

/// Persists `theme`, logging and swallowing any failure
pub async fn save_theme(store: &dyn ThemeStore, theme: &ThemeData) {
    let json = match serde_json::to_string(theme) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "Theme serialization error");
            return;
        }
    };

    let bytes = json.len();
    if let Err(e) = store.write(THEME_STORAGE_KEY, json).await {
        tracing::error!(store = store.name(), bytes, error = %e, "Failed to save theme");
    }
}
