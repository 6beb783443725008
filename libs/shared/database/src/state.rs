use std::sync::Arc;

use tracing::info;

use shared_config::AppConfig;

use crate::{InMemoryStore, KeyValueStore, RedisStore, StoreError};

/// Shared handler state: configuration plus the store every cell reads and writes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn KeyValueStore>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    /// Connects to Redis when `REDIS_URL` is configured, otherwise runs on the in-memory store.
    pub async fn from_config(config: AppConfig) -> Result<Self, StoreError> {
        let store: Arc<dyn KeyValueStore> = match config.redis_url.as_deref() {
            Some(url) => Arc::new(RedisStore::new(url).await?),
            None => {
                info!("Using in-memory store");
                Arc::new(InMemoryStore::new())
            }
        };

        Ok(Self::new(config, store))
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(config, Arc::new(InMemoryStore::new()))
    }
}
