//! Multi-Level Cache - Local Tier, Remote Tier and a Loader
//!
//! Extends the two-level flow with two concerns:
//!
//! - **Stampede protection**: concurrent misses for one key share a single
//!   loader call. Each load runs as a spawned task; the registry maps the
//!   in-flight key to a shared handle on it, so every caller awaiting it
//!   receives the same value or error. The entry is removed as soon as the
//!   load completes, whether or not anyone is still waiting.
//! - **Remote degradation**: a background probe pings the store on a fixed
//!   interval and flips a health flag. While the flag is down the remote tier
//!   is skipped entirely and misses go straight to the loader.
//!
//! ```text
//! get:  Local ─hit─► return
//!         │ miss
//!         ▼
//!       Remote (if healthy) ─hit─► backfill Local ► return
//!         │ miss / error / unhealthy
//!         ▼
//!       Loader (one call per key in flight) ─ok─► set ► return to all waiters
//! ```
//!
//! Failed `get` lookups against the remote never touch the health flag; only
//! the probe does.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, Span, debug, info, warn};

use crate::codecs::JsonCodec;
use crate::config::{HealthConfig, MultiLevelConfig, RemoteConfig};
use crate::error::{CacheError, Result};
use crate::local::LocalCache;
use crate::pool::WorkerPool;
use crate::stats::{Counter, MultiLevelStats};
use crate::traits::{Cache, CacheCodec, CacheKey, CacheValue, KeyFn, RemoteStore};

/// Produces the value for a key missing from every tier
pub type Loader<K, V> = Arc<dyn Fn(K) -> BoxFuture<'static, anyhow::Result<V>> + Send + Sync>;

type SharedLoad<V> = Shared<BoxFuture<'static, Result<V>>>;

/// Box a plain async closure into a [`Loader`]
pub fn loader_fn<K, V, F, Fut>(f: F) -> Loader<K, V>
where
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
{
    Arc::new(move |key| f(key).boxed())
}

/// Removes an in-flight entry when the load finishes, unwinds or is dropped
struct InFlightGuard<'a, K: CacheKey, V> {
    map: &'a DashMap<K, SharedLoad<V>>,
    key: K,
}

impl<K: CacheKey, V> Drop for InFlightGuard<'_, K, V> {
    fn drop(&mut self) {
        self.map.remove(&self.key);
    }
}

struct Inner<K, V, C> {
    local: Arc<LocalCache<K, V>>,
    store: Arc<dyn RemoteStore>,
    loader: Loader<K, V>,
    key_fn: KeyFn<K>,
    codec: C,
    remote: RemoteConfig,
    health: HealthConfig,
    in_flight: DashMap<K, SharedLoad<V>>,
    remote_healthy: AtomicBool,
    failed_probes: AtomicU32,
    pool: WorkerPool,
    span: Span,
    local_hits: Counter,
    remote_hits: Counter,
    loads: Counter,
    coalesced: Counter,
    load_errors: Counter,
    remote_errors: Counter,
    background_failures: Arc<Counter>,
}

/// Local tier, remote tier and loader with stampede protection and
/// remote health tracking
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use tiered_cache::{MemoryStore, MultiLevelCache, MultiLevelConfig};
///
/// # async fn example() -> tiered_cache::Result<()> {
/// let cache = MultiLevelCache::new(
///     Arc::new(MemoryStore::new()),
///     |id: &u64| format!("user:{id}"),
///     |id: u64| async move { Ok(format!("user #{id}")) },
///     MultiLevelConfig::default(),
/// )?;
///
/// assert_eq!(cache.get(&7).await?, "user #7");
/// # Ok(())
/// # }
/// ```
pub struct MultiLevelCache<K, V, C = JsonCodec> {
    inner: Arc<Inner<K, V, C>>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> MultiLevelCache<K, V, JsonCodec>
where
    K: CacheKey,
    V: CacheValue + Serialize + DeserializeOwned,
{
    /// Create a cache storing remote values as JSON and start its health monitor
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Config` when called outside a tokio runtime or
    /// with a zero probe interval.
    pub fn new<F, Fut>(
        store: Arc<dyn RemoteStore>,
        key_fn: impl Fn(&K) -> String + Send + Sync + 'static,
        loader: F,
        config: MultiLevelConfig,
    ) -> Result<Self>
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        Self::with_parts(
            store,
            Arc::new(key_fn),
            loader_fn(loader),
            config,
            JsonCodec,
            Span::current(),
        )
    }
}

impl<K, V, C> MultiLevelCache<K, V, C>
where
    K: CacheKey,
    V: CacheValue + Serialize + DeserializeOwned,
    C: CacheCodec,
{
    /// Create a cache from explicit parts and start its health monitor
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Config` when called outside a tokio runtime or
    /// with a zero probe interval.
    pub fn with_parts(
        store: Arc<dyn RemoteStore>,
        key_fn: KeyFn<K>,
        loader: Loader<K, V>,
        config: MultiLevelConfig,
        codec: C,
        span: Span,
    ) -> Result<Self> {
        if config.health.interval.is_zero() {
            return Err(CacheError::Config(
                "health probe interval must be non-zero".to_string(),
            ));
        }
        let pool = WorkerPool::new(config.pool, span.clone())?;

        info!(
            parent: &span,
            store = store.name(),
            codec = codec.name(),
            capacity = config.local.effective_capacity(),
            policy = %config.local.policy,
            probe_interval_ms = %config.health.interval.as_millis(),
            "Initializing multi-level cache"
        );

        let inner = Arc::new(Inner {
            local: Arc::new(LocalCache::with_span(config.local, span.clone())),
            store,
            loader,
            key_fn,
            codec,
            remote: config.remote,
            health: config.health,
            in_flight: DashMap::new(),
            remote_healthy: AtomicBool::new(true),
            failed_probes: AtomicU32::new(0),
            pool,
            span,
            local_hits: Counter::default(),
            remote_hits: Counter::default(),
            loads: Counter::default(),
            coalesced: Counter::default(),
            load_errors: Counter::default(),
            remote_errors: Counter::default(),
            background_failures: Arc::default(),
        });
        let monitor = Inner::spawn_monitor(&inner);

        Ok(Self {
            inner,
            monitor: Mutex::new(Some(monitor)),
        })
    }

    /// Local tier, then the remote tier if healthy, then the loader
    ///
    /// # Errors
    ///
    /// Only loader failures reach the caller (as `CacheError::Loader`); remote
    /// misses and failures fall through to the loader.
    pub async fn get(&self, key: &K) -> Result<V> {
        let inner = &self.inner;
        if let Ok(value) = inner.local.get(key) {
            inner.local_hits.incr();
            return Ok(value);
        }

        if inner.is_remote_healthy() {
            let storage_key = (inner.key_fn)(key);
            match inner.fetch_remote(&storage_key).await {
                Ok(value) => {
                    inner.remote_hits.incr();
                    inner.local.set(key.clone(), value.clone());
                    debug!(parent: &inner.span, key = %storage_key, "[MultiLevel] Backfilled local tier from remote");
                    return Ok(value);
                }
                Err(CacheError::NotFound) => {}
                Err(e) => {
                    inner.remote_errors.incr();
                    warn!(parent: &inner.span, key = %storage_key, error = %e, "[MultiLevel] Remote lookup failed, falling back to loader");
                }
            }
        }

        self.load(key.clone()).await
    }

    /// Join the in-flight load for `key`, or start one
    async fn load(&self, key: K) -> Result<V> {
        let shared = match self.inner.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                self.inner.coalesced.incr();
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                // detached from callers: the entry is cleared when the task ends
                let task = tokio::spawn(
                    Arc::clone(&self.inner)
                        .run_loader(key)
                        .instrument(self.inner.span.clone()),
                );
                let load = async move {
                    task.await.unwrap_or_else(|e| {
                        Err(CacheError::loader(anyhow::anyhow!("loader task failed: {e}")))
                    })
                }
                .boxed()
                .shared();
                entry.insert(load.clone());
                load
            }
        };
        shared.await
    }

    /// Write the local tier now; queue the remote write while it is healthy
    pub fn set(&self, key: K, value: V) {
        self.inner.set(key, value);
    }

    /// Delete from the local tier now; queue the remote delete while it is healthy
    pub fn delete(&self, key: &K) {
        let inner = &self.inner;
        inner.local.delete(key);
        if !inner.is_remote_healthy() {
            return;
        }
        let store = Arc::clone(&inner.store);
        let storage_key = (inner.key_fn)(key);
        let task_key = storage_key.clone();
        inner.pool.submit_remote(
            "delete",
            storage_key,
            inner.remote.timeout,
            &inner.background_failures,
            async move { store.del(&task_key).await },
        );
    }

    pub fn is_remote_healthy(&self) -> bool {
        self.inner.is_remote_healthy()
    }

    /// Probe the remote store now, with the same effect as a monitor tick
    pub async fn check_remote_health(&self) -> bool {
        self.inner.probe().await
    }

    pub fn local(&self) -> &Arc<LocalCache<K, V>> {
        &self.inner.local
    }

    pub fn stats(&self) -> MultiLevelStats {
        let inner = &self.inner;
        MultiLevelStats {
            local_hits: inner.local_hits.get(),
            remote_hits: inner.remote_hits.get(),
            loads: inner.loads.get(),
            coalesced: inner.coalesced.get(),
            load_errors: inner.load_errors.get(),
            remote_errors: inner.remote_errors.get(),
            background_failures: inner.background_failures.get(),
            in_flight: inner.in_flight.len(),
            remote_healthy: inner.is_remote_healthy(),
        }
    }

    /// Stop the health monitor and wait for queued remote writes
    ///
    /// Get/Set/Delete keep working afterwards; remote writes are dropped.
    pub async fn shutdown(&self) {
        if let Some(monitor) = self.monitor.lock().take() {
            monitor.abort();
        }
        self.inner.pool.shutdown().await;
    }
}

impl<K, V, C> Inner<K, V, C>
where
    K: CacheKey,
    V: CacheValue + Serialize + DeserializeOwned,
    C: CacheCodec,
{
    fn is_remote_healthy(&self) -> bool {
        self.remote_healthy.load(Ordering::Acquire)
    }

    async fn fetch_remote(&self, storage_key: &str) -> Result<V> {
        let bytes = tokio::time::timeout(self.remote.timeout, self.store.get(storage_key))
            .await
            .unwrap_or(Err(CacheError::Timeout(self.remote.timeout)))?;
        self.codec.deserialize(&bytes).map_err(CacheError::codec)
    }

    async fn run_loader(self: Arc<Self>, key: K) -> Result<V> {
        let _guard = InFlightGuard {
            map: &self.in_flight,
            key: key.clone(),
        };
        self.loads.incr();

        match (self.loader)(key.clone()).await {
            Ok(value) => {
                self.set(key, value.clone());
                Ok(value)
            }
            Err(e) => {
                self.load_errors.incr();
                let storage_key = (self.key_fn)(&key);
                warn!(parent: &self.span, key = %storage_key, error = %e, "[MultiLevel] Loader failed");
                Err(CacheError::loader(e))
            }
        }
    }

    fn set(&self, key: K, value: V) {
        let storage_key = (self.key_fn)(&key);
        let encoded = self
            .is_remote_healthy()
            .then(|| self.codec.serialize(&value));
        self.local.set(key, value);

        match encoded {
            Some(Ok(bytes)) => {
                let store = Arc::clone(&self.store);
                let ttl = self.remote.ttl;
                let task_key = storage_key.clone();
                self.pool.submit_remote(
                    "set",
                    storage_key,
                    self.remote.timeout,
                    &self.background_failures,
                    async move { store.set(&task_key, &bytes, ttl).await },
                );
            }
            Some(Err(e)) => {
                self.background_failures.incr();
                warn!(parent: &self.span, key = %storage_key, error = %e, "[MultiLevel] Value failed to encode, remote write skipped");
            }
            None => {}
        }
    }

    /// One health probe; returns whether the store answered
    async fn probe(&self) -> bool {
        let outcome = tokio::time::timeout(self.remote.timeout, self.store.ping())
            .await
            .unwrap_or(Err(CacheError::Timeout(self.remote.timeout)));

        match outcome {
            Ok(()) => {
                self.failed_probes.store(0, Ordering::Relaxed);
                if !self.remote_healthy.swap(true, Ordering::AcqRel) {
                    info!(parent: &self.span, store = self.store.name(), "[MultiLevel] Remote store reachable, remote tier re-enabled");
                }
                true
            }
            Err(e) => {
                let failed = self.failed_probes.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(parent: &self.span, failed, error = %e, "[MultiLevel] Health probe failed");
                let threshold = self.health.degrade_after;
                if threshold > 0
                    && failed >= threshold
                    && self.remote_healthy.swap(false, Ordering::AcqRel)
                {
                    warn!(parent: &self.span, store = self.store.name(), failed, "[MultiLevel] Remote store unreachable, bypassing remote tier");
                }
                false
            }
        }
    }

    fn spawn_monitor(inner: &Arc<Self>) -> JoinHandle<()> {
        let weak = Arc::downgrade(inner);
        let interval = inner.health.interval;
        tokio::spawn(
            async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                // the first tick completes immediately
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    let Some(inner) = weak.upgrade() else { break };
                    inner.probe().await;
                }
            }
            .instrument(inner.span.clone()),
        )
    }
}

impl<K, V, C> Drop for MultiLevelCache<K, V, C> {
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.get_mut().take() {
            monitor.abort();
        }
    }
}

#[async_trait]
impl<K, V, C> Cache<K, V> for MultiLevelCache<K, V, C>
where
    K: CacheKey,
    V: CacheValue + Serialize + DeserializeOwned,
    C: CacheCodec,
{
    async fn get(&self, key: &K) -> Result<V> {
        MultiLevelCache::get(self, key).await
    }

    async fn set(&self, key: K, value: V) -> Result<()> {
        MultiLevelCache::set(self, key, value);
        Ok(())
    }

    async fn delete(&self, key: &K) -> Result<()> {
        MultiLevelCache::delete(self, key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "MultiLevel"
    }
}
