//! Local Cache - Bounded In-Process Tier
//!
//! A key → value map bounded by an [`EvictionPolicy`]. The map sits behind a
//! read/write lock so lookups run concurrently with each other; the policy
//! sits behind its own mutex because even a lookup updates its bookkeeping.
//! Locks are always taken map first, policy second, which keeps the two in
//! agreement: a key is in the map exactly when the policy tracks it.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::{Span, debug, info, trace};

use crate::config::LocalConfig;
use crate::error::{CacheError, Result};
use crate::policy::{EvictionPolicy, PolicyKind};
use crate::stats::{Counter, LocalStats};
use crate::traits::{Cache, CacheKey, CacheValue};

/// Bounded in-process cache with LRU or LFU eviction
///
/// Capacity is a soft cap: when the policy has no victim to offer the new
/// entry is still inserted.
///
/// # Example
///
/// ```rust
/// use tiered_cache::{LocalCache, PolicyKind};
///
/// let cache = LocalCache::new(2, PolicyKind::Lru);
/// cache.set("a", 1);
/// cache.set("b", 2);
/// assert_eq!(cache.get(&"a").ok(), Some(1));
/// assert_eq!(cache.set("c", 3), Some("b"));
/// ```
pub struct LocalCache<K, V> {
    store: RwLock<HashMap<K, V>>,
    policy: Mutex<Box<dyn EvictionPolicy<K>>>,
    capacity: usize,
    kind: PolicyKind,
    span: Span,
    hits: Counter,
    misses: Counter,
    sets: Counter,
    evictions: Counter,
}

impl<K, V> LocalCache<K, V>
where
    K: CacheKey,
    V: CacheValue,
{
    /// Create a local cache; a `capacity` of 0 selects the default
    #[must_use]
    pub fn new(capacity: usize, policy: PolicyKind) -> Self {
        Self::from_config(LocalConfig { capacity, policy })
    }

    #[must_use]
    pub fn from_config(config: LocalConfig) -> Self {
        Self::with_span(config, Span::current())
    }

    /// Create a local cache whose log events are emitted under `span`
    #[must_use]
    pub fn with_span(config: LocalConfig, span: Span) -> Self {
        let capacity = config.effective_capacity();
        info!(parent: &span, capacity, policy = %config.policy, "Initializing local cache");

        Self {
            store: RwLock::new(HashMap::with_capacity(capacity)),
            policy: Mutex::new(config.policy.build(capacity)),
            capacity,
            kind: config.policy,
            span,
            hits: Counter::default(),
            misses: Counter::default(),
            sets: Counter::default(),
            evictions: Counter::default(),
        }
    }

    /// Look up `key`, recording the access with the policy
    ///
    /// # Errors
    ///
    /// Returns `CacheError::NotFound` when the key is not resident.
    pub fn get(&self, key: &K) -> Result<V> {
        let store = self.store.read();
        if let Some(value) = store.get(key) {
            self.policy.lock().access(key);
            self.hits.incr();
            Ok(value.clone())
        } else {
            self.misses.incr();
            Err(CacheError::NotFound)
        }
    }

    /// Insert or overwrite `key`, returning the key evicted to make room
    ///
    /// Overwriting a resident key counts as an access and never evicts.
    pub fn set(&self, key: K, value: V) -> Option<K> {
        let mut store = self.store.write();
        let mut policy = self.policy.lock();
        self.sets.incr();

        if let Some(slot) = store.get_mut(&key) {
            *slot = value;
            policy.access(&key);
            return None;
        }

        let mut evicted = None;
        if store.len() >= self.capacity {
            match policy.evict() {
                Some(victim) => {
                    store.remove(&victim);
                    self.evictions.incr();
                    trace!(parent: &self.span, size = store.len(), "[Local] Evicted entry");
                    evicted = Some(victim);
                }
                None => {
                    debug!(
                        parent: &self.span,
                        size = store.len(),
                        capacity = self.capacity,
                        "[Local] No eviction candidate, exceeding capacity"
                    );
                }
            }
        }

        store.insert(key.clone(), value);
        policy.add(key);
        evicted
    }

    /// Remove `key` from the map and the policy, returning its value
    pub fn delete(&self, key: &K) -> Option<V> {
        let mut store = self.store.write();
        let removed = store.remove(key);
        self.policy.lock().remove(key);
        removed
    }

    /// Whether `key` is resident. Does not count as an access.
    pub fn contains(&self, key: &K) -> bool {
        self.store.read().contains_key(key)
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut store = self.store.write();
        store.clear();
        self.policy.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy_kind(&self) -> PolicyKind {
        self.kind
    }

    pub fn stats(&self) -> LocalStats {
        LocalStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
            sets: self.sets.get(),
            evictions: self.evictions.get(),
            size: self.len(),
            capacity: self.capacity,
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.policy.lock().len()
    }
}

#[async_trait]
impl<K, V> Cache<K, V> for LocalCache<K, V>
where
    K: CacheKey,
    V: CacheValue,
{
    async fn get(&self, key: &K) -> Result<V> {
        LocalCache::get(self, key)
    }

    async fn set(&self, key: K, value: V) -> Result<()> {
        LocalCache::set(self, key, value);
        Ok(())
    }

    async fn delete(&self, key: &K) -> Result<()> {
        LocalCache::delete(self, key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Local"
    }
}
