//! Cache Builder
//!
//! Collects the construction-time options shared by every composition and
//! assembles a local, two-level or multi-level cache from them.
//!
//! # Example: Local Cache
//!
//! ```rust
//! use tiered_cache::{CacheBuilder, PolicyKind};
//!
//! let cache = CacheBuilder::new()
//!     .capacity(10_000)
//!     .policy(PolicyKind::Lfu)
//!     .build_local::<String, u64>();
//!
//! cache.set("hits".to_string(), 1);
//! assert_eq!(cache.get(&"hits".to_string()).ok(), Some(1));
//! ```
//!
//! # Example: Multi-Level Cache over Redis
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tiered_cache::{CacheBuilder, RedisStore};
//!
//! # async fn example() -> tiered_cache::Result<()> {
//! let store = Arc::new(RedisStore::new().await?);
//! let cache = CacheBuilder::new()
//!     .name("profiles")
//!     .remote_ttl(Duration::from_secs(300))
//!     .degrade_after(3)
//!     .build_multi_level(
//!         store,
//!         |id: &u64| format!("profile:{id}"),
//!         |id: u64| async move { Ok(format!("profile #{id}")) },
//!     )?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::Span;

use crate::codecs::JsonCodec;
use crate::config::MultiLevelConfig;
use crate::error::Result;
use crate::local::LocalCache;
use crate::multi_level::{MultiLevelCache, loader_fn};
use crate::policy::PolicyKind;
use crate::remote::RemoteCache;
use crate::traits::{CacheCodec, CacheKey, CacheValue, RemoteStore};
use crate::two_level::TwoLevelCache;

/// Builder for every cache composition
///
/// Unset options keep the defaults of [`MultiLevelConfig`]. Unless a span is
/// supplied, each built cache logs under an `info_span!("cache", name)`.
#[derive(Debug, Clone)]
pub struct CacheBuilder<C = JsonCodec> {
    config: MultiLevelConfig,
    name: &'static str,
    span: Option<Span>,
    codec: C,
}

impl CacheBuilder<JsonCodec> {
    pub fn new() -> Self {
        Self {
            config: MultiLevelConfig::default(),
            name: "cache",
            span: None,
            codec: JsonCodec,
        }
    }
}

impl Default for CacheBuilder<JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CacheCodec> CacheBuilder<C> {
    /// Start from a complete configuration, e.g. one loaded from a file
    #[must_use]
    pub fn config(mut self, config: MultiLevelConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.local.capacity = capacity;
        self
    }

    #[must_use]
    pub fn policy(mut self, policy: PolicyKind) -> Self {
        self.config.local.policy = policy;
        self
    }

    /// Expiration of every entry written to the remote tier
    #[must_use]
    pub fn remote_ttl(mut self, ttl: Duration) -> Self {
        self.config.remote.ttl = ttl;
        self
    }

    /// Bound on each remote call
    #[must_use]
    pub fn remote_timeout(mut self, timeout: Duration) -> Self {
        self.config.remote.timeout = timeout;
        self
    }

    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.pool.workers = workers;
        self
    }

    #[must_use]
    pub fn queue_size(mut self, queue_size: usize) -> Self {
        self.config.pool.queue_size = queue_size;
        self
    }

    #[must_use]
    pub fn health_interval(mut self, interval: Duration) -> Self {
        self.config.health.interval = interval;
        self
    }

    /// Consecutive failed probes before the remote tier is bypassed
    #[must_use]
    pub fn degrade_after(mut self, failed_probes: u32) -> Self {
        self.config.health.degrade_after = failed_probes;
        self
    }

    /// Name recorded on the default span
    #[must_use]
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Emit every log event of the built cache under `span`
    #[must_use]
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Encode remote values with `codec`
    pub fn codec<C2: CacheCodec>(self, codec: C2) -> CacheBuilder<C2> {
        CacheBuilder {
            config: self.config,
            name: self.name,
            span: self.span,
            codec,
        }
    }

    pub fn build_local<K: CacheKey, V: CacheValue>(&self) -> LocalCache<K, V> {
        LocalCache::with_span(self.config.local, self.make_span())
    }

    /// Local tier in front of `store`
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Config` when called outside a tokio runtime.
    pub fn build_two_level<K, V>(
        self,
        store: Arc<dyn RemoteStore>,
        key_fn: impl Fn(&K) -> String + Send + Sync + 'static,
    ) -> Result<TwoLevelCache<K, V, C>>
    where
        K: CacheKey,
        V: CacheValue + Serialize + DeserializeOwned,
    {
        let span = self.make_span();
        let local = Arc::new(LocalCache::with_span(self.config.local, span.clone()));
        let remote = Arc::new(
            RemoteCache::with_codec(store, self.config.remote.ttl, Arc::new(key_fn), self.codec)
                .with_span(span.clone()),
        );
        TwoLevelCache::with_pool(local, remote, self.config.remote.timeout, self.config.pool, span)
    }

    /// Local tier, `store` and `loader` with stampede protection
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Config` when called outside a tokio runtime or
    /// with a zero health interval.
    pub fn build_multi_level<K, V, F, Fut>(
        self,
        store: Arc<dyn RemoteStore>,
        key_fn: impl Fn(&K) -> String + Send + Sync + 'static,
        loader: F,
    ) -> Result<MultiLevelCache<K, V, C>>
    where
        K: CacheKey,
        V: CacheValue + Serialize + DeserializeOwned,
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let span = self.make_span();
        MultiLevelCache::with_parts(
            store,
            Arc::new(key_fn),
            loader_fn(loader),
            self.config,
            self.codec,
            span,
        )
    }

    fn make_span(&self) -> Span {
        self.span
            .clone()
            .unwrap_or_else(|| tracing::info_span!("cache", name = self.name))
    }
}
