//! Remote Store Implementations
//!
//! Implementations of [`RemoteStore`](crate::traits::RemoteStore), the shared
//! key-value store behind the remote tier.
//!
//! - **Redis** - Default shared store (feature: `redis`)
//! - **Memory** - In-process map with per-entry expiry, for single-process
//!   deployments and tests

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;
