//! LRU cache with statistics tracking.
//!
//! Entries live in a slab; recency is a doubly-linked list threaded through
//! slab indices, so `get`, `insert` and eviction are all O(1). Single-owner
//! (`&mut self`): callers that share one cache wrap it themselves.

#![allow(clippy::cast_precision_loss)] // Precision loss acceptable for hit rate calculation

use rustc_hash::FxHashMap;
use std::hash::Hash;

const NIL: usize = usize::MAX;

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of evictions.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate hit rate (0.0 to 1.0).
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

/// Fixed-capacity LRU cache with O(1) operations.
///
/// A capacity of 0 stores nothing: every `get` misses.
#[derive(Debug, Clone)]
pub struct LruCache<K, V> {
    capacity: usize,
    map: FxHashMap<K, usize>,
    nodes: Vec<Node<K, V>>,
    /// Most recently used.
    head: usize,
    /// Least recently used.
    tail: usize,
    stats: CacheStats,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create a new LRU cache with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: FxHashMap::default(),
            nodes: Vec::new(),
            head: NIL,
            tail: NIL,
            stats: CacheStats::default(),
        }
    }

    /// Get the capacity of the cache.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the current number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Get a value by key, marking it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        match self.map.get(key).copied() {
            Some(idx) => {
                self.stats.hits += 1;
                self.touch(idx);
                Some(&self.nodes[idx].value)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Like [`LruCache::get`], but an entry rejected by `accept` counts as a
    /// miss and is left where it is.
    pub fn get_matching(&mut self, key: &K, accept: impl FnOnce(&V) -> bool) -> Option<&V> {
        match self.map.get(key).copied() {
            Some(idx) if accept(&self.nodes[idx].value) => {
                self.stats.hits += 1;
                self.touch(idx);
                Some(&self.nodes[idx].value)
            }
            _ => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Looks up a value without touching recency or statistics.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.map.get(key).map(|&idx| &self.nodes[idx].value)
    }

    /// Insert a key-value pair, evicting the LRU entry if at capacity.
    pub fn insert(&mut self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }
        if let Some(&idx) = self.map.get(&key) {
            self.nodes[idx].value = value;
            self.touch(idx);
            return;
        }

        let idx = if self.nodes.len() < self.capacity {
            self.nodes.push(Node {
                key: key.clone(),
                value,
                prev: NIL,
                next: NIL,
            });
            self.nodes.len() - 1
        } else {
            // Reuse the least recently used slot.
            let idx = self.tail;
            self.unlink(idx);
            let node = &mut self.nodes[idx];
            let old = std::mem::replace(&mut node.key, key.clone());
            node.value = value;
            self.map.remove(&old);
            self.stats.evictions += 1;
            idx
        };
        self.map.insert(key, idx);
        self.push_front(idx);
    }

    /// Remove every entry; statistics are kept.
    pub fn clear(&mut self) {
        self.map.clear();
        self.nodes.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    /// Get cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    fn touch(&mut self, idx: usize) {
        if self.head != idx {
            self.unlink(idx);
            self.push_front(idx);
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        if prev == NIL {
            self.head = next;
        } else {
            self.nodes[prev].next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.nodes[next].prev = prev;
        }
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = NIL;
    }

    fn push_front(&mut self, idx: usize) {
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = self.head;
        if self.head != NIL {
            self.nodes[self.head].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }
}
