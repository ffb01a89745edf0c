//! Remote Cache - Typed Adapter over a Shared Store
//!
//! Turns the byte-oriented [`RemoteStore`] into a typed tier: logical keys go
//! through the caller's [`KeyFn`], values through a [`CacheCodec`], and every
//! write carries the cache's fixed expiration. The store handle is injected
//! and shared; this type never opens or closes a connection.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{Span, debug};

use crate::codecs::JsonCodec;
use crate::error::{CacheError, Result};
use crate::traits::{Cache, CacheCodec, CacheKey, CacheValue, KeyFn, RemoteStore};

/// Typed view of a shared remote store
pub struct RemoteCache<K, V, C = JsonCodec> {
    store: Arc<dyn RemoteStore>,
    expiration: Duration,
    key_fn: KeyFn<K>,
    codec: C,
    span: Span,
    _value: PhantomData<fn() -> V>,
}

impl<K, V> RemoteCache<K, V, JsonCodec>
where
    K: CacheKey,
    V: CacheValue + Serialize + DeserializeOwned,
{
    /// Create a remote cache that stores values as JSON
    pub fn new(
        store: Arc<dyn RemoteStore>,
        expiration: Duration,
        key_fn: impl Fn(&K) -> String + Send + Sync + 'static,
    ) -> Self {
        Self::with_codec(store, expiration, Arc::new(key_fn), JsonCodec)
    }
}

impl<K, V, C> RemoteCache<K, V, C>
where
    K: CacheKey,
    V: CacheValue + Serialize + DeserializeOwned,
    C: CacheCodec,
{
    pub fn with_codec(
        store: Arc<dyn RemoteStore>,
        expiration: Duration,
        key_fn: KeyFn<K>,
        codec: C,
    ) -> Self {
        Self {
            store,
            expiration,
            key_fn,
            codec,
            span: Span::current(),
            _value: PhantomData,
        }
    }

    /// Emit log events under `span`
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Storage key for a logical key
    pub fn storage_key(&self, key: &K) -> String {
        (self.key_fn)(key)
    }

    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    /// Fetch and decode
    ///
    /// # Errors
    ///
    /// `NotFound` when absent, a remote error when the store fails, a codec
    /// error when the stored bytes do not decode as `V`.
    pub async fn get(&self, key: &K) -> Result<V> {
        let storage_key = self.storage_key(key);
        let bytes = self.store.get(&storage_key).await?;
        self.codec.deserialize(&bytes).map_err(|e| {
            debug!(parent: &self.span, key = %storage_key, error = %e, "[Remote] Stored value failed to decode");
            CacheError::codec(e)
        })
    }

    /// Encode and store with the cache's expiration
    ///
    /// # Errors
    ///
    /// A codec error when `value` cannot be encoded, a remote error when the
    /// store fails.
    pub async fn set(&self, key: &K, value: &V) -> Result<()> {
        let storage_key = self.storage_key(key);
        let bytes = self.codec.serialize(value).map_err(CacheError::codec)?;
        self.store.set(&storage_key, &bytes, self.expiration).await
    }

    /// Remove the storage key; absence is not an error
    ///
    /// # Errors
    ///
    /// A remote error when the store fails.
    pub async fn delete(&self, key: &K) -> Result<()> {
        self.store.del(&self.storage_key(key)).await
    }
}

#[async_trait]
impl<K, V, C> Cache<K, V> for RemoteCache<K, V, C>
where
    K: CacheKey,
    V: CacheValue + Serialize + DeserializeOwned,
    C: CacheCodec,
{
    async fn get(&self, key: &K) -> Result<V> {
        RemoteCache::get(self, key).await
    }

    async fn set(&self, key: K, value: V) -> Result<()> {
        RemoteCache::set(self, &key, &value).await
    }

    async fn delete(&self, key: &K) -> Result<()> {
        RemoteCache::delete(self, key).await
    }

    fn name(&self) -> &'static str {
        "Remote"
    }
}
