//! Tiered Cache
//!
//! A layered caching library for async Rust:
//! - **Local Tier**: bounded in-process map with O(1) LRU or LFU eviction
//! - **Remote Tier**: typed view of a shared key-value store (Redis by default)
//! - **Two-Level Cache**: read-through with local backfill, write-back to the remote tier
//! - **Multi-Level Cache**: adds a loader, per-key stampede protection and
//!   remote health tracking
//! - **Background Propagation**: remote writes run on a bounded worker pool
//!   and never fail the caller
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tiered_cache::{CacheBuilder, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> tiered_cache::Result<()> {
//!     let cache = CacheBuilder::new()
//!         .capacity(10_000)
//!         .build_multi_level(
//!             Arc::new(MemoryStore::new()),
//!             |id: &u64| format!("user:{id}"),
//!             |id: u64| async move { Ok(format!("user #{id}")) },
//!         )?;
//!
//!     // Loaded once, then served from the local tier
//!     let user = cache.get(&42).await?;
//!     tracing::info!(%user, "Loaded");
//!
//!     let stats = cache.stats();
//!     tracing::info!(loads = stats.loads, local_hits = stats.local_hits, "Cache stats");
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Request → Local (LRU/LFU) → Remote (Redis) → Loader
//!           ↓ Hit             ↓ Hit            ↓ Miss (one call per key)
//!           Return            Backfill Local   Store in Local + Remote
//! ```

pub mod builder;
pub mod codecs;
pub mod config;
pub mod error;
pub mod local;
pub mod multi_level;
pub mod policy;
pub mod pool;
pub mod remote;
pub mod stats;
pub mod store;
pub mod traits;
pub mod two_level;

pub use builder::CacheBuilder;
pub use codecs::JsonCodec;
#[cfg(feature = "bincode")]
pub use codecs::BincodeCodec;
#[cfg(feature = "msgpack")]
pub use codecs::MsgPackCodec;
pub use config::{
    DEFAULT_CAPACITY, HealthConfig, LocalConfig, MultiLevelConfig, PoolConfig, RemoteConfig,
};
pub use error::{CacheError, Result};
pub use local::LocalCache;
pub use multi_level::{Loader, MultiLevelCache, loader_fn};
pub use policy::{EvictionPolicy, LfuPolicy, LruPolicy, PolicyKind};
pub use pool::WorkerPool;
pub use remote::RemoteCache;
pub use stats::{LocalStats, MultiLevelStats, TwoLevelStats};
pub use store::MemoryStore;
#[cfg(feature = "redis")]
pub use store::RedisStore;
pub use traits::{Cache, CacheCodec, CacheKey, CacheValue, KeyFn, RemoteStore};
pub use two_level::TwoLevelCache;

// Re-export async_trait for user convenience
pub use async_trait::async_trait;
