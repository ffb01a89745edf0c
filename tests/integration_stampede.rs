//! Integration tests for stampede protection
//!
//! Tests concurrent misses and loader call coalescing

mod common;

use common::test_data::{User, user_key};
use common::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tiered_cache::{CacheBuilder, CacheError, MultiLevelCache, RemoteStore};
use tokio::task::JoinSet;

fn counting_cache(
    store: Arc<FlakyStore>,
    calls: Arc<AtomicU32>,
    fail: bool,
) -> Arc<MultiLevelCache<u64, User>> {
    let cache = CacheBuilder::new()
        .name("stampede_test")
        .build_multi_level(store, user_key, move |id: u64| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                if fail {
                    anyhow::bail!("database unavailable");
                }
                Ok(User::new(id))
            }
        })
        .unwrap_or_else(|e| panic!("Failed to build cache: {e}"));
    Arc::new(cache)
}

/// Test stampede protection with concurrent requests
#[tokio::test]
async fn test_concurrent_cache_miss() {
    init_tracing();
    let calls = Arc::new(AtomicU32::new(0));
    let cache = counting_cache(FlakyStore::new(), Arc::clone(&calls), false);

    // Spawn 100 concurrent requests for same key
    let mut tasks = JoinSet::new();
    for _ in 0..100 {
        let cache_clone = Arc::clone(&cache);
        tasks.spawn(async move { cache_clone.get(&7).await });
    }

    while let Some(result) = tasks.join_next().await {
        let user = result
            .unwrap_or_else(|_| panic!("Task panicked"))
            .unwrap_or_else(|e| panic!("Load failed: {e}"));
        assert_eq!(user, User::new(7));
    }

    let loader_calls = calls.load(Ordering::SeqCst);
    assert_eq!(
        loader_calls, 1,
        "Expected exactly 1 loader call, got {loader_calls}",
    );

    let stats = cache.stats();
    assert_eq!(stats.loads, 1);
    assert_eq!(stats.in_flight, 0);
    assert!(cache.local().contains(&7));
}

/// Test that every waiter sees the same failure and nothing is cached
#[tokio::test]
async fn test_concurrent_loader_failure_is_shared() {
    let calls = Arc::new(AtomicU32::new(0));
    let store = FlakyStore::new();
    let cache = counting_cache(Arc::clone(&store), Arc::clone(&calls), true);

    let mut tasks = JoinSet::new();
    for _ in 0..20 {
        let cache_clone = Arc::clone(&cache);
        tasks.spawn(async move { cache_clone.get(&1).await });
    }

    while let Some(result) = tasks.join_next().await {
        let outcome = result.unwrap_or_else(|_| panic!("Task panicked"));
        match outcome {
            Err(CacheError::Loader(e)) => assert!(e.to_string().contains("database unavailable")),
            other => panic!("Expected loader error, got {other:?}"),
        }
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats().load_errors, 1);

    // errors are not cached: the next miss loads again
    assert!(cache.local().is_empty());
    assert!(cache.get(&1).await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// Test that distinct keys load independently
#[tokio::test]
async fn test_distinct_keys_are_not_coalesced() {
    let calls = Arc::new(AtomicU32::new(0));
    let cache = counting_cache(FlakyStore::new(), Arc::clone(&calls), false);

    let mut tasks = JoinSet::new();
    for id in 0..10_u64 {
        let cache_clone = Arc::clone(&cache);
        tasks.spawn(async move { (id, cache_clone.get(&id).await) });
    }
    while let Some(result) = tasks.join_next().await {
        let (id, user) = result.unwrap_or_else(|_| panic!("Task panicked"));
        assert_eq!(user.ok(), Some(User::new(id)));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 10);
}

/// Test that loads are coalesced per logical key, not per storage key
#[tokio::test]
async fn test_colliding_storage_keys_keep_their_own_values() {
    let cache: Arc<MultiLevelCache<u64, User>> = Arc::new(
        CacheBuilder::new()
            .build_multi_level(FlakyStore::new(), |_: &u64| "shared".to_string(), |id: u64| async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok(User::new(id))
            })
            .unwrap_or_else(|e| panic!("Failed to build cache: {e}")),
    );

    let (a, b) = tokio::join!(cache.get(&1), cache.get(&2));
    assert_eq!(a.ok(), Some(User::new(1)));
    assert_eq!(b.ok(), Some(User::new(2)));
}

/// Test that a loaded value is written through to the remote store
#[tokio::test]
async fn test_loaded_value_reaches_remote() {
    let calls = Arc::new(AtomicU32::new(0));
    let store = FlakyStore::new();
    let cache = counting_cache(Arc::clone(&store), Arc::clone(&calls), false);

    assert!(cache.get(&11).await.is_ok());
    let propagated = wait_for(|| store.memory().len() == 1, 1000).await;
    assert!(propagated, "Loaded value should propagate to the remote store");
    assert!(store.get("user:11").await.is_ok());

    // another instance finds it remotely and never loads
    let other_calls = Arc::new(AtomicU32::new(0));
    let other = counting_cache(store, Arc::clone(&other_calls), false);
    assert_eq!(other.get(&11).await.ok(), Some(User::new(11)));
    assert_eq!(other_calls.load(Ordering::SeqCst), 0);
    assert_eq!(other.stats().remote_hits, 1);
}

/// Test that an undecodable remote value falls through to the loader
#[tokio::test]
async fn test_corrupt_remote_value_falls_back_to_loader() {
    let calls = Arc::new(AtomicU32::new(0));
    let store = FlakyStore::new();
    store
        .set("user:4", b"{not json", Duration::from_secs(60))
        .await
        .unwrap_or_else(|e| panic!("seed failed: {e}"));
    let cache = counting_cache(store, Arc::clone(&calls), false);

    assert_eq!(cache.get(&4).await.ok(), Some(User::new(4)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats().remote_errors, 1);
}

/// Test that a caller giving up does not strand its load or leak the cache
#[tokio::test]
async fn test_abandoned_load_completes_and_cache_is_released() {
    let calls = Arc::new(AtomicU32::new(0));
    let store = FlakyStore::new();
    let cache = counting_cache(Arc::clone(&store), Arc::clone(&calls), false);

    // the loader takes 50ms; the only caller stops waiting long before that
    let abandoned = tokio::time::timeout(Duration::from_millis(5), cache.get(&21)).await;
    assert!(abandoned.is_err(), "Caller should have timed out");

    let finished = wait_for(|| cache.stats().in_flight == 0, 1000).await;
    assert!(finished, "Load should finish without any caller");
    assert!(cache.local().contains(&21));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // served from the finished load, no second loader call
    assert_eq!(cache.get(&21).await.ok(), Some(User::new(21)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    drop(cache);
    let released = wait_for(|| Arc::strong_count(&store) == 1, 1000).await;
    assert!(released, "Dropping the cache should release the store handle");
}
