//! Least-frequently-used policy
//!
//! Keys are grouped into per-frequency buckets; inside a bucket the most
//! recently touched key sits at the head. Eviction takes the tail of the
//! bucket at `min_freq`.
//!
//! `min_freq` moves in exactly two places: a new key resets it to 1, and an
//! increment that empties the current minimum bucket advances it by one.
//! Eviction and removal discard an emptied bucket without advancing it, so a
//! later `evict` can find no candidate while keys at higher frequencies are
//! still tracked. [`LocalCache`](crate::LocalCache) treats that as a soft cap.

use std::collections::HashMap;
use std::hash::Hash;

use super::EvictionPolicy;
use super::list::{Arena, List};

#[derive(Debug)]
struct Tracked<K> {
    key: K,
    freq: u64,
}

/// LFU policy with O(1) add, access, evict and remove
#[derive(Debug)]
pub struct LfuPolicy<K> {
    arena: Arena<Tracked<K>>,
    slots: HashMap<K, usize>,
    buckets: HashMap<u64, List>,
    min_freq: u64,
}

impl<K> LfuPolicy<K>
where
    K: Eq + Hash + Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            slots: HashMap::new(),
            buckets: HashMap::new(),
            min_freq: 0,
        }
    }

    /// Current access count of `key`
    pub fn frequency(&self, key: &K) -> Option<u64> {
        let idx = *self.slots.get(key)?;
        self.arena.get(idx).map(|tracked| tracked.freq)
    }

    /// Move the key in `idx` from its bucket to the head of the next one
    fn increment(&mut self, idx: usize) {
        let Some(freq) = self.arena.get(idx).map(|tracked| tracked.freq) else {
            return;
        };

        if let Some(bucket) = self.buckets.get_mut(&freq) {
            bucket.unlink(&mut self.arena, idx);
            if bucket.is_empty() {
                self.buckets.remove(&freq);
                if self.min_freq == freq {
                    self.min_freq += 1;
                }
            }
        }

        let next = freq + 1;
        if let Some(tracked) = self.arena.get_mut(idx) {
            tracked.freq = next;
        }
        self.buckets
            .entry(next)
            .or_default()
            .push_front(&mut self.arena, idx);
    }
}

impl<K> Default for LfuPolicy<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> EvictionPolicy<K> for LfuPolicy<K>
where
    K: Eq + Hash + Clone + Send,
{
    fn add(&mut self, key: K) {
        if let Some(&idx) = self.slots.get(&key) {
            self.increment(idx);
            return;
        }
        let idx = self.arena.alloc(Tracked {
            key: key.clone(),
            freq: 1,
        });
        self.buckets
            .entry(1)
            .or_default()
            .push_front(&mut self.arena, idx);
        self.slots.insert(key, idx);
        self.min_freq = 1;
    }

    fn access(&mut self, key: &K) {
        if let Some(&idx) = self.slots.get(key) {
            self.increment(idx);
        }
    }

    fn evict(&mut self) -> Option<K> {
        let bucket = self.buckets.get_mut(&self.min_freq)?;
        let idx = bucket.back()?;
        bucket.unlink(&mut self.arena, idx);
        if bucket.is_empty() {
            self.buckets.remove(&self.min_freq);
        }
        let tracked = self.arena.release(idx)?;
        self.slots.remove(&tracked.key);
        Some(tracked.key)
    }

    fn remove(&mut self, key: &K) {
        let Some(idx) = self.slots.remove(key) else {
            return;
        };
        if let Some(freq) = self.arena.get(idx).map(|tracked| tracked.freq) {
            if let Some(bucket) = self.buckets.get_mut(&freq) {
                bucket.unlink(&mut self.arena, idx);
                if bucket.is_empty() {
                    self.buckets.remove(&freq);
                }
            }
        }
        self.arena.release(idx);
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn clear(&mut self) {
        self.arena.clear();
        self.slots.clear();
        self.buckets.clear();
        self.min_freq = 0;
    }
}
