//! Cache Traits
//!
//! This module defines the seams of the crate:
//!
//! - `Cache`: the Get/Set/Delete contract shared by every tier and composition
//! - `RemoteStore`: the byte-oriented boundary to a shared key-value store
//! - `CacheCodec`: pluggable serialization for values crossing into the remote tier
//!
//! # Example: Custom Remote Store
//!
//! ```rust,ignore
//! use tiered_cache::{async_trait, CacheError, RemoteStore, Result};
//! use std::time::Duration;
//!
//! struct MyStore {
//!     // Your client handle
//! }
//!
//! #[async_trait]
//! impl RemoteStore for MyStore {
//!     async fn get(&self, key: &str) -> Result<Vec<u8>> {
//!         // Return Err(CacheError::NotFound) when the key is absent
//!     }
//!
//!     async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
//!         // Your implementation
//!     }
//!
//!     async fn del(&self, key: &str) -> Result<()> {
//!         // Absence is not an error
//!     }
//!
//!     async fn ping(&self) -> Result<()> {
//!         // Your implementation
//!     }
//! }
//! ```

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

/// Bounds every cache key satisfies
pub trait CacheKey: Eq + Hash + Clone + Send + Sync + 'static {}

impl<T> CacheKey for T where T: Eq + Hash + Clone + Send + Sync + 'static {}

/// Bounds every cached value satisfies
pub trait CacheValue: Clone + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Clone + Send + Sync + 'static {}

/// Maps a logical key to its storage key in the remote tier
///
/// Must be deterministic: the same logical key always yields the same string.
pub type KeyFn<K> = Arc<dyn Fn(&K) -> String + Send + Sync>;

/// Get/Set/Delete contract shared by every tier
///
/// A miss is reported as [`CacheError::NotFound`](crate::CacheError::NotFound)
/// so callers can tell it apart from transport and codec failures.
#[async_trait]
pub trait Cache<K, V>: Send + Sync
where
    K: CacheKey,
    V: CacheValue,
{
    /// Get value by key
    async fn get(&self, key: &K) -> Result<V>;

    /// Store value under key
    async fn set(&self, key: K, value: V) -> Result<()>;

    /// Remove key; succeeds when the key is already absent
    async fn delete(&self, key: &K) -> Result<()>;

    /// Name used in log events
    fn name(&self) -> &'static str {
        "unknown"
    }
}

/// Byte-oriented shared key-value store backing the remote tier
///
/// The store handle is injected and may be shared by any number of caches, so
/// implementations must be safe for concurrent use.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the bytes stored under `key`
    ///
    /// # Errors
    ///
    /// Returns `CacheError::NotFound` when the key is absent, or a remote error
    /// when the store cannot be reached.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Store bytes under `key`, expiring after `ttl`
    ///
    /// A zero `ttl` stores the entry without expiration.
    ///
    /// # Errors
    ///
    /// Returns a remote error when the store cannot be reached.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Remove `key`. A missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns a remote error when the store cannot be reached.
    async fn del(&self, key: &str) -> Result<()>;

    /// Reachability probe used by the health monitor
    ///
    /// # Errors
    ///
    /// Returns a remote error when the store cannot be reached.
    async fn ping(&self) -> Result<()>;

    /// Name of this store, used in log events
    fn name(&self) -> &'static str {
        "unknown"
    }
}

#[async_trait]
impl<S: RemoteStore + ?Sized> RemoteStore for Arc<S> {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        (**self).set(key, value, ttl).await
    }

    async fn del(&self, key: &str) -> Result<()> {
        (**self).del(key).await
    }

    async fn ping(&self) -> Result<()> {
        (**self).ping().await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Trait for cache value serialization/deserialization
///
/// Values written to the remote tier must round-trip exactly through the
/// codec. Implementations must be `Send + Sync + Debug` since one codec
/// instance is shared by every background write.
///
/// # Example: Custom Codec
///
/// ```rust,ignore
/// use tiered_cache::CacheCodec;
/// use anyhow::Result;
/// use serde::{Serialize, de::DeserializeOwned};
///
/// #[derive(Debug, Clone)]
/// struct MyCustomCodec;
///
/// impl CacheCodec for MyCustomCodec {
///     fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
///         Ok(mycodec::serialize(value)?)
///     }
///
///     fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
///         Ok(mycodec::deserialize(bytes)?)
///     }
///
///     fn name(&self) -> &'static str {
///         "mycodec"
///     }
/// }
/// ```
pub trait CacheCodec: Send + Sync + Debug + 'static {
    /// Serialize a value to bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented in this format.
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> anyhow::Result<Vec<u8>>;

    /// Deserialize bytes to a value
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid encoding of `T`.
    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> anyhow::Result<T>;

    /// Get the name of the codec
    fn name(&self) -> &'static str;
}
