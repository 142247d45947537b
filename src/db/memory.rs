use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::db::ThemeStore;
use crate::error::{AppError, AppResult};

/// In-process theme store
///
/// Used when no Redis URL is configured. An optional quota caps the total
/// size of stored values; writes that would exceed it fail.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Arc::default(),
            quota: Some(quota),
        }
    }
}

#[async_trait::async_trait]
impl ThemeStore for MemoryStore {
    async fn read(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: String) -> AppResult<()> {
        let mut entries = self.entries.write().await;

        if let Some(quota) = self.quota {
            let others: usize = entries
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(existing, stored)| existing.len() + stored.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(AppError::QuotaExceeded { needed, quota });
            }
        }

        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
