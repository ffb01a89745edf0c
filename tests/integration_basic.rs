//! Integration tests for basic cache operations
//!
//! Every composition behind the shared `Cache` trait, and the local tier's
//! eviction policies seen from the outside

mod common;

use common::test_data::{User, user_key};
use common::*;
use std::sync::Arc;
use std::time::Duration;
use tiered_cache::{
    Cache, CacheBuilder, CacheError, LocalCache, MemoryStore, MultiLevelCache, MultiLevelConfig,
    PolicyKind, RemoteCache, TwoLevelCache,
};

async fn exercise(cache: &dyn Cache<u64, User>, loads_on_miss: bool) {
    let first = cache.get(&1).await;
    if loads_on_miss {
        assert_eq!(first.ok(), Some(User::new(1)));
    } else {
        assert!(
            matches!(first, Err(CacheError::NotFound)),
            "{} should miss before any write",
            cache.name()
        );
    }

    cache
        .set(1, User::new(1))
        .await
        .unwrap_or_else(|e| panic!("{} set failed: {e}", cache.name()));
    assert_eq!(cache.get(&1).await.ok(), Some(User::new(1)));

    cache
        .delete(&1)
        .await
        .unwrap_or_else(|e| panic!("{} delete failed: {e}", cache.name()));
    // deleting an absent key succeeds
    cache
        .delete(&1)
        .await
        .unwrap_or_else(|e| panic!("{} second delete failed: {e}", cache.name()));
}

/// Test that every composition honours the same contract
#[tokio::test]
async fn test_cache_trait_contract() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());

    let local: LocalCache<u64, User> = LocalCache::new(16, PolicyKind::Lru);
    exercise(&local, false).await;

    let remote: RemoteCache<u64, User> =
        RemoteCache::new(store.clone(), Duration::from_secs(60), user_key);
    exercise(&remote, false).await;

    let two_level = TwoLevelCache::new(
        Arc::new(LocalCache::new(16, PolicyKind::Lfu)),
        Arc::new(RemoteCache::new(
            store.clone(),
            Duration::from_secs(60),
            user_key,
        )),
        Duration::from_millis(200),
    )
    .unwrap_or_else(|e| panic!("two-level: {e}"));
    exercise(&two_level, false).await;

    let multi_level = MultiLevelCache::new(
        store,
        user_key,
        |id: u64| async move { Ok(User::new(id)) },
        MultiLevelConfig::default(),
    )
    .unwrap_or_else(|e| panic!("multi-level: {e}"));
    exercise(&multi_level, true).await;
}

/// Test LRU eviction order through the public API
#[tokio::test]
async fn test_lru_evicts_least_recently_used() {
    let cache = CacheBuilder::new()
        .capacity(3)
        .policy(PolicyKind::Lru)
        .build_local::<&'static str, u32>();

    cache.set("a", 1);
    cache.set("b", 2);
    cache.set("c", 3);
    // touch "a" so "b" becomes the oldest
    assert_eq!(cache.get(&"a").ok(), Some(1));

    cache.set("d", 4);
    assert!(cache.get(&"b").is_err());
    assert!(cache.contains(&"a"));
    assert!(cache.contains(&"c"));
    assert!(cache.contains(&"d"));
    assert_eq!(cache.len(), 3);
}

/// Test LFU eviction prefers the least frequently used key
#[tokio::test]
async fn test_lfu_evicts_least_frequently_used() {
    let cache = CacheBuilder::new()
        .capacity(3)
        .policy(PolicyKind::Lfu)
        .build_local::<&'static str, u32>();

    cache.set("a", 1);
    cache.set("b", 2);
    cache.set("c", 3);
    for _ in 0..3 {
        let _ = cache.get(&"a");
    }
    let _ = cache.get(&"c");

    cache.set("d", 4);
    assert!(!cache.contains(&"b"), "b had the lowest frequency");
    assert!(cache.contains(&"a"));
    assert!(cache.contains(&"c"));

    let stats = cache.stats();
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.size, 3);
}

/// Test that overwriting a key never evicts another one
#[tokio::test]
async fn test_overwrite_at_capacity_keeps_other_keys() {
    let cache = LocalCache::new(2, PolicyKind::Lru);
    cache.set(1_u8, "one");
    cache.set(2_u8, "two");
    cache.set(1_u8, "uno");

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get(&1).ok(), Some("uno"));
    assert_eq!(cache.get(&2).ok(), Some("two"));
}
