//! Cache Configuration
//!
//! Construction-time options for every tier. Each struct has sensible
//! defaults and deserializes with serde, so it can be embedded in a larger
//! application config. Missing fields fall back to their defaults.

use std::time::Duration;

use serde::Deserialize;

use crate::policy::PolicyKind;

/// Capacity used when a non-positive capacity is requested
pub const DEFAULT_CAPACITY: usize = 1000;

/// Configuration for [`LocalCache`](crate::LocalCache)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Maximum resident entries; `0` selects [`DEFAULT_CAPACITY`]
    pub capacity: usize,
    /// Eviction policy
    pub policy: PolicyKind,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            policy: PolicyKind::Lru,
        }
    }
}

impl LocalConfig {
    /// Capacity with the default substituted for `0`
    #[must_use]
    pub fn effective_capacity(&self) -> usize {
        if self.capacity == 0 {
            DEFAULT_CAPACITY
        } else {
            self.capacity
        }
    }
}

/// Remote tier options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Expiration applied to every entry written through one cache
    pub ttl: Duration,
    /// Bound on each remote call, independent of the caller
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(600),
            timeout: Duration::from_millis(500),
        }
    }
}

/// Background propagation worker set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of worker tasks
    pub workers: usize,
    /// Queued tasks beyond which new tasks are dropped
    pub queue_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_size: 1024,
        }
    }
}

/// Remote health monitor for [`MultiLevelCache`](crate::MultiLevelCache)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Probe interval
    pub interval: Duration,
    /// Consecutive failed probes before the remote tier is bypassed.
    /// `0` never bypasses it: probes can only mark the remote healthy.
    pub degrade_after: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            degrade_after: 0,
        }
    }
}

/// Everything a [`MultiLevelCache`](crate::MultiLevelCache) needs besides
/// its collaborators
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MultiLevelConfig {
    pub local: LocalConfig,
    pub remote: RemoteConfig,
    pub pool: PoolConfig,
    pub health: HealthConfig,
}
