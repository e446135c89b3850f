use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use thiserror::Error;
use tracing::info;

use shared_config::AppConfig;

use crate::models::ConversationState;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Redis pool error: {0}")]
    Pool(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Per-phone conversation state, keyed by the patient's WhatsApp number.
/// Entries expire on their own so an abandoned chat resets to a clean
/// greeting instead of a stale treatment pick.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn get(&self, phone: &str) -> Result<Option<ConversationState>, StoreError>;
    async fn set(&self, phone: &str, state: &ConversationState) -> Result<(), StoreError>;
    async fn delete(&self, phone: &str) -> Result<(), StoreError>;
}

pub struct RedisConversationStore {
    pool: Pool,
    ttl_seconds: u64,
}

impl RedisConversationStore {
    pub async fn new(config: &AppConfig) -> Result<Self, StoreError> {
        let redis_url = config
            .redis_url
            .clone()
            .unwrap_or_else(|| "redis://localhost:6379".to_string());

        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::Pool(format!("Pool creation error: {}", e)))?;

        // Test connection
        let mut conn = pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(format!("Connection error: {}", e)))?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis conversation store initialized successfully");

        Ok(Self {
            pool,
            ttl_seconds: config.conversation_ttl_seconds,
        })
    }

    fn key(phone: &str) -> String {
        format!("conversation:{}", phone)
    }
}

#[async_trait]
impl ConversationStore for RedisConversationStore {
    async fn get(&self, phone: &str) -> Result<Option<ConversationState>, StoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(format!("Connection error: {}", e)))?;

        let raw: Option<String> = conn.get(Self::key(phone)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, phone: &str, state: &ConversationState) -> Result<(), StoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(format!("Connection error: {}", e)))?;

        let json = serde_json::to_string(state)?;
        let _: () = conn.set_ex(Self::key(phone), json, self.ttl_seconds).await?;
        Ok(())
    }

    async fn delete(&self, phone: &str) -> Result<(), StoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(format!("Connection error: {}", e)))?;

        let _: () = conn.del(Self::key(phone)).await?;
        Ok(())
    }
}
