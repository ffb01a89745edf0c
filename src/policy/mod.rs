//! Eviction Policies
//!
//! A policy tracks the keys resident in a bounded store and picks the victim
//! when the store is full. Two policies are provided:
//!
//! - **LRU**: evicts the least recently used key
//! - **LFU**: evicts the least frequently used key, least recently touched first
//!   among keys of equal frequency
//!
//! Every operation is O(1). Policies are not synchronized; the owning
//! [`LocalCache`](crate::LocalCache) serializes access to them.

mod lfu;
mod list;
mod lru;

pub use lfu::LfuPolicy;
pub use lru::LruPolicy;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// Tracks key recency/frequency and chooses eviction victims
pub trait EvictionPolicy<K>: Send {
    /// Start tracking `key`. Re-adding a tracked key counts as an access.
    fn add(&mut self, key: K);

    /// Record a use of `key`; no-op when untracked
    fn access(&mut self, key: &K);

    /// Stop tracking and return the policy's victim, if it has one
    fn evict(&mut self) -> Option<K>;

    /// Stop tracking `key`; no-op when untracked
    fn remove(&mut self, key: &K);

    /// Number of tracked keys
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all tracking state
    fn clear(&mut self);
}

/// Policy selection for a local tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Least recently used
    #[default]
    Lru,
    /// Least frequently used
    Lfu,
}

impl PolicyKind {
    /// Instantiate an empty policy of this kind
    #[must_use]
    pub fn build<K>(self, capacity: usize) -> Box<dyn EvictionPolicy<K>>
    where
        K: Eq + Hash + Clone + Send + 'static,
    {
        match self {
            Self::Lru => Box::new(LruPolicy::with_capacity(capacity)),
            Self::Lfu => Box::new(LfuPolicy::new()),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lru => f.write_str("lru"),
            Self::Lfu => f.write_str("lfu"),
        }
    }
}

impl std::str::FromStr for PolicyKind {
    type Err = crate::CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(Self::Lru),
            "lfu" => Ok(Self::Lfu),
            other => Err(crate::CacheError::Config(format!(
                "unknown eviction policy '{other}' (expected 'lru' or 'lfu')"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_kind_parses_case_insensitively() {
        assert_eq!("LFU".parse::<PolicyKind>().ok(), Some(PolicyKind::Lfu));
        assert_eq!("lru".parse::<PolicyKind>().ok(), Some(PolicyKind::Lru));
        assert!("arc".parse::<PolicyKind>().is_err());
    }

    #[test]
    fn built_policies_follow_their_kind() {
        // Same trace, different victims: "a" is old but hot.
        for (kind, victim) in [(PolicyKind::Lru, "b"), (PolicyKind::Lfu, "c")] {
            let mut policy = kind.build::<&str>(3);
            policy.add("a");
            policy.add("b");
            policy.access(&"a");
            policy.access(&"a");
            policy.access(&"b");
            policy.add("c");
            policy.access(&"a");
            assert_eq!(policy.evict(), Some(victim), "{kind}");
        }
    }
}
