//! Integration tests against a live Redis server
//!
//! Run with `cargo test -- --ignored` and `REDIS_URL` pointing at a server.

#![cfg(feature = "redis")]

mod common;

use common::test_data::User;
use common::*;
use std::sync::Arc;
use std::time::Duration;
use tiered_cache::{CacheBuilder, CacheError, RedisStore, RemoteStore};

async fn connect() -> Arc<RedisStore> {
    Arc::new(
        RedisStore::with_url(&redis_url())
            .await
            .unwrap_or_else(|e| panic!("Failed to connect to Redis: {e}")),
    )
}

/// Test the raw store contract including expiry
#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_redis_store_roundtrip() {
    let store = connect().await;
    let key = test_key("raw");

    store
        .set(&key, b"payload", Duration::from_millis(300))
        .await
        .unwrap_or_else(|e| panic!("set failed: {e}"));
    assert_eq!(store.get(&key).await.ok(), Some(b"payload".to_vec()));

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(matches!(store.get(&key).await, Err(CacheError::NotFound)));

    assert!(store.del(&key).await.is_ok());
    assert!(store.ping().await.is_ok());
}

/// Test a two-level cache propagating to Redis
#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_two_level_over_redis() {
    init_tracing();
    let store = connect().await;
    let prefix = test_key("two_level");
    let key_prefix = prefix.clone();

    let cache = CacheBuilder::new()
        .remote_ttl(Duration::from_secs(30))
        .build_two_level(store.clone(), move |id: &u64| format!("{key_prefix}:{id}"))
        .unwrap_or_else(|e| panic!("Failed to build cache: {e}"));

    cache.set(1, User::new(1));
    cache.shutdown().await;

    let stored = store
        .get(&format!("{prefix}:1"))
        .await
        .unwrap_or_else(|e| panic!("value missing from Redis: {e}"));
    let user: User = serde_json::from_slice(&stored).unwrap_or_else(|e| panic!("decode: {e}"));
    assert_eq!(user, User::new(1));

    let _ = store.del(&format!("{prefix}:1")).await;
}
