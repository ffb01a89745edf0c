//! Two-Level Cache - Local Tier in Front of a Remote Tier
//!
//! Read-through, write-back composition:
//!
//! ```text
//! get:    Local ──hit──► return
//!           │ miss
//!           ▼
//!         Remote (bounded by timeout) ──hit──► backfill Local ► return
//!           │ miss / error
//!           ▼
//!         NotFound / error to caller
//!
//! set:    Local (sync) ► return      Remote (queued, best effort)
//! delete: Local (sync) ► return      Remote (queued, best effort)
//! ```
//!
//! No ordering is promised between a local write and its remote propagation:
//! another process reading the remote tier may see the previous value for a
//! short window.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{Instrument, Span, debug, warn};

use crate::codecs::JsonCodec;
use crate::config::PoolConfig;
use crate::error::{CacheError, Result};
use crate::local::LocalCache;
use crate::pool::WorkerPool;
use crate::remote::RemoteCache;
use crate::stats::{Counter, TwoLevelStats};
use crate::traits::{Cache, CacheCodec, CacheKey, CacheValue};

/// Local tier backed by a remote tier
pub struct TwoLevelCache<K, V, C = JsonCodec> {
    local: Arc<LocalCache<K, V>>,
    remote: Arc<RemoteCache<K, V, C>>,
    timeout: Duration,
    pool: WorkerPool,
    span: Span,
    local_hits: Counter,
    remote_hits: Counter,
    misses: Counter,
    remote_errors: Counter,
    background_failures: Arc<Counter>,
}

impl<K, V, C> TwoLevelCache<K, V, C>
where
    K: CacheKey,
    V: CacheValue + Serialize + DeserializeOwned,
    C: CacheCodec,
{
    /// Compose two tiers; every remote call is bounded by `timeout`
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Config` when called outside a tokio runtime.
    pub fn new(
        local: Arc<LocalCache<K, V>>,
        remote: Arc<RemoteCache<K, V, C>>,
        timeout: Duration,
    ) -> Result<Self> {
        Self::with_pool(local, remote, timeout, PoolConfig::default(), Span::current())
    }

    /// Compose two tiers with an explicit worker pool size and log span
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Config` when called outside a tokio runtime.
    pub fn with_pool(
        local: Arc<LocalCache<K, V>>,
        remote: Arc<RemoteCache<K, V, C>>,
        timeout: Duration,
        pool: PoolConfig,
        span: Span,
    ) -> Result<Self> {
        let pool = WorkerPool::new(pool, span.clone())?;
        debug!(parent: &span, timeout_ms = %timeout.as_millis(), "Two-level cache ready");

        Ok(Self {
            local,
            remote,
            timeout,
            pool,
            span,
            local_hits: Counter::default(),
            remote_hits: Counter::default(),
            misses: Counter::default(),
            remote_errors: Counter::default(),
            background_failures: Arc::default(),
        })
    }

    /// Local tier first, then the remote tier with backfill
    ///
    /// # Errors
    ///
    /// `NotFound` when neither tier holds the key; remote, codec or timeout
    /// errors from the remote lookup are returned as-is.
    pub async fn get(&self, key: &K) -> Result<V> {
        if let Ok(value) = self.local.get(key) {
            self.local_hits.incr();
            return Ok(value);
        }

        let remote = tokio::time::timeout(self.timeout, self.remote.get(key))
            .instrument(self.span.clone())
            .await
            .unwrap_or(Err(CacheError::Timeout(self.timeout)));

        match remote {
            Ok(value) => {
                self.remote_hits.incr();
                self.local.set(key.clone(), value.clone());
                debug!(parent: &self.span, key = %self.remote.storage_key(key), "[TwoLevel] Backfilled local tier from remote");
                Ok(value)
            }
            Err(CacheError::NotFound) => {
                self.misses.incr();
                Err(CacheError::NotFound)
            }
            Err(e) => {
                self.remote_errors.incr();
                warn!(parent: &self.span, key = %self.remote.storage_key(key), error = %e, "[TwoLevel] Remote lookup failed");
                Err(e)
            }
        }
    }

    /// Write the local tier now and queue the remote write
    ///
    /// Never fails because of the remote tier.
    pub fn set(&self, key: K, value: V) {
        let storage_key = self.remote.storage_key(&key);
        self.local.set(key.clone(), value.clone());

        let remote = Arc::clone(&self.remote);
        self.pool.submit_remote(
            "set",
            storage_key,
            self.timeout,
            &self.background_failures,
            async move { remote.set(&key, &value).await },
        );
    }

    /// Delete from the local tier now and queue the remote delete
    pub fn delete(&self, key: &K) {
        self.local.delete(key);

        let remote = Arc::clone(&self.remote);
        let key = key.clone();
        self.pool.submit_remote(
            "delete",
            self.remote.storage_key(&key),
            self.timeout,
            &self.background_failures,
            async move { remote.delete(&key).await },
        );
    }

    pub fn local(&self) -> &Arc<LocalCache<K, V>> {
        &self.local
    }

    pub fn remote(&self) -> &Arc<RemoteCache<K, V, C>> {
        &self.remote
    }

    pub fn stats(&self) -> TwoLevelStats {
        TwoLevelStats {
            local_hits: self.local_hits.get(),
            remote_hits: self.remote_hits.get(),
            misses: self.misses.get(),
            remote_errors: self.remote_errors.get(),
            background_failures: self.background_failures.get(),
        }
    }

    /// Stop accepting background work and wait for queued remote writes
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}

#[async_trait]
impl<K, V, C> Cache<K, V> for TwoLevelCache<K, V, C>
where
    K: CacheKey,
    V: CacheValue + Serialize + DeserializeOwned,
    C: CacheCodec,
{
    async fn get(&self, key: &K) -> Result<V> {
        TwoLevelCache::get(self, key).await
    }

    async fn set(&self, key: K, value: V) -> Result<()> {
        TwoLevelCache::set(self, key, value);
        Ok(())
    }

    async fn delete(&self, key: &K) -> Result<()> {
        TwoLevelCache::delete(self, key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "TwoLevel"
    }
}
