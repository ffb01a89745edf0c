//! Memory Store - In-Process `RemoteStore`
//!
//! A concurrent `DashMap` of byte values with per-entry expiration. It has the
//! same observable contract as a real shared store, which makes it the store
//! of choice for tests and for running a two-level cache without Redis.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::traits::RemoteStore;

#[derive(Debug, Clone)]
struct StoredEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn new(value: &[u8], ttl: Duration) -> Self {
        Self {
            value: value.to_vec(),
            expires_at: (!ttl.is_zero()).then(|| Instant::now() + ttl),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Instant::now() >= expires_at)
    }
}

/// In-process remote store
///
/// Cloning is cheap and clones share the same entries, like several handles
/// to one Redis server.
///
/// ```rust
/// use tiered_cache::{MemoryStore, RemoteStore};
/// use std::time::Duration;
///
/// # async fn example() -> tiered_cache::Result<()> {
/// let store = MemoryStore::new();
/// store.set("user:1", b"alice", Duration::from_secs(60)).await?;
/// assert_eq!(store.get("user:1").await?, b"alice".to_vec());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    map: Arc<DashMap<String, StoredEntry>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove expired entries, returning how many were dropped
    ///
    /// Expired entries are also dropped lazily on read.
    pub fn purge_expired(&self) -> usize {
        let mut removed = 0;
        self.map.retain(|_, entry| {
            if entry.is_expired() {
                removed += 1;
                false
            } else {
                true
            }
        });
        if removed > 0 {
            debug!(count = removed, "[Memory] Purged expired entries");
        }
        removed
    }

    /// Stored entries, including expired ones not yet purged
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let Some(entry) = self.map.get(key) else {
            return Err(CacheError::NotFound);
        };
        if entry.is_expired() {
            drop(entry); // release the shard read lock before removing
            self.map.remove_if(key, |_, entry| entry.is_expired());
            return Err(CacheError::NotFound);
        }
        Ok(entry.value.clone())
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.map.insert(key.to_string(), StoredEntry::new(value, ttl));
        debug!(key = %key, ttl_ms = %ttl.as_millis(), "[Memory] Stored key");
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.map.remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(store.get("nope").await, Err(CacheError::NotFound)));
        assert!(store.del("nope").await.is_ok());
    }

    #[tokio::test]
    async fn entries_expire() {
        let store = MemoryStore::new();
        store
            .set("short", b"1", Duration::from_millis(20))
            .await
            .unwrap_or_else(|e| panic!("set failed: {e}"));
        store
            .set("forever", b"2", Duration::ZERO)
            .await
            .unwrap_or_else(|e| panic!("set failed: {e}"));
        assert!(store.get("short").await.is_ok());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(matches!(store.get("short").await, Err(CacheError::NotFound)));
        assert_eq!(store.purge_expired(), 0);
        assert_eq!(store.get("forever").await.ok(), Some(b"2".to_vec()));
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let store = MemoryStore::new();
        let other = store.clone();
        store
            .set("k", b"v", Duration::from_secs(5))
            .await
            .unwrap_or_else(|e| panic!("set failed: {e}"));
        assert_eq!(other.get("k").await.ok(), Some(b"v".to_vec()));
        other.del("k").await.unwrap_or_else(|e| panic!("del failed: {e}"));
        assert!(store.is_empty());
    }
}
