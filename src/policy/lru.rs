//! Least-recently-used policy

use std::collections::HashMap;
use std::hash::Hash;

use super::EvictionPolicy;
use super::list::{Arena, List};

/// LRU policy: a recency list (most recent at head) plus a key → slot index
#[derive(Debug)]
pub struct LruPolicy<K> {
    arena: Arena<K>,
    order: List,
    slots: HashMap<K, usize>,
}

impl<K> LruPolicy<K>
where
    K: Eq + Hash + Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            order: List::new(),
            slots: HashMap::new(),
        }
    }

    /// Pre-size for `capacity` keys
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: Arena::with_capacity(capacity),
            order: List::new(),
            slots: HashMap::with_capacity(capacity),
        }
    }
}

impl<K> Default for LruPolicy<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> EvictionPolicy<K> for LruPolicy<K>
where
    K: Eq + Hash + Clone + Send,
{
    fn add(&mut self, key: K) {
        if let Some(&idx) = self.slots.get(&key) {
            self.order.move_to_front(&mut self.arena, idx);
            return;
        }
        let idx = self.arena.alloc(key.clone());
        self.order.push_front(&mut self.arena, idx);
        self.slots.insert(key, idx);
    }

    fn access(&mut self, key: &K) {
        if let Some(&idx) = self.slots.get(key) {
            self.order.move_to_front(&mut self.arena, idx);
        }
    }

    fn evict(&mut self) -> Option<K> {
        let idx = self.order.back()?;
        self.order.unlink(&mut self.arena, idx);
        let key = self.arena.release(idx)?;
        self.slots.remove(&key);
        Some(key)
    }

    fn remove(&mut self, key: &K) {
        if let Some(idx) = self.slots.remove(key) {
            self.order.unlink(&mut self.arena, idx);
            self.arena.release(idx);
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn clear(&mut self) {
        self.arena.clear();
        self.order = List::new();
        self.slots.clear();
    }
}
