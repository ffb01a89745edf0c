//! Redis Store - Shared `RemoteStore` over Redis
//!
//! Uses a `ConnectionManager`, which reconnects on its own, so a Redis outage
//! shows up as failed calls rather than a dead handle. Cloning the store
//! clones the manager and shares the underlying connection.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::{debug, info};

use crate::error::{CacheError, Result};
use crate::traits::RemoteStore;

/// Redis-backed remote store
#[derive(Clone)]
pub struct RedisStore {
    conn_manager: ConnectionManager,
}

impl RedisStore {
    /// Connect using `REDIS_URL`, defaulting to `redis://127.0.0.1:6379`
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis client cannot be created or connection fails.
    pub async fn new() -> Result<Self> {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        Self::with_url(&redis_url).await
    }

    /// Connect to an explicit Redis URL
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis client cannot be created or connection fails.
    pub async fn with_url(redis_url: &str) -> Result<Self> {
        info!(redis_url = %redis_url, "Initializing Redis store with ConnectionManager");

        let client = Client::open(redis_url)
            .with_context(|| format!("Failed to create Redis client with URL: {redis_url}"))
            .map_err(CacheError::remote)?;

        let conn_manager = ConnectionManager::new(client)
            .await
            .context("Failed to establish Redis connection manager")
            .map_err(CacheError::remote)?;

        let store = Self { conn_manager };
        store.ping().await?;

        info!(redis_url = %redis_url, "Redis store connected");
        Ok(store)
    }

    /// Wrap an existing connection manager
    #[must_use]
    pub fn from_connection(conn_manager: ConnectionManager) -> Self {
        Self { conn_manager }
    }
}

#[async_trait]
impl RemoteStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let mut conn = self.conn_manager.clone();
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(CacheError::remote)?;
        value.ok_or(CacheError::NotFound)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        if ttl.is_zero() {
            let _: () = conn.set(key, value).await.map_err(CacheError::remote)?;
        } else {
            // PX keeps sub-second TTLs intact
            let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
            let _: () = conn
                .pset_ex(key, value, millis)
                .await
                .map_err(CacheError::remote)?;
        }
        debug!(key = %key, ttl_ms = %ttl.as_millis(), "[Redis] Stored key with TTL");
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let _: usize = conn.del(key).await.map_err(CacheError::remote)?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("Redis PING failed")
            .map_err(CacheError::remote)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Redis"
    }
}
