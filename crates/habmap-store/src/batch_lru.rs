//! Least-recently-used map that evicts in batches
//!
//! Once an insert pushes the map past its ceiling, a whole batch of the
//! least-recently-used entries is dropped at once, so the next `batch - 1`
//! inserts do not evict anything.

use std::hash::Hash;

use lru::LruCache;

#[derive(Debug)]
pub struct BatchLru<K: Hash + Eq, V> {
    entries: LruCache<K, V>,
    max_entries: usize,
    evict_batch: usize,
}

impl<K: Hash + Eq + Clone, V> BatchLru<K, V> {
    /// Zero sizes are raised to one
    pub fn new(max_entries: usize, evict_batch: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            max_entries: max_entries.max(1),
            evict_batch: evict_batch.max(1),
        }
    }

    /// Look up an entry, moving it to the most-recently-used end
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Look up an entry without touching its position
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.peek(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains(key)
    }

    /// Insert (or replace) an entry as most-recently-used and return whatever
    /// had to be evicted to get back under the ceiling.
    ///
    /// The entry just inserted is never part of the evicted batch.
    pub fn insert(&mut self, key: K, value: V) -> Vec<(K, V)> {
        self.entries.put(key, value);

        let len = self.entries.len();
        if len <= self.max_entries {
            return Vec::new();
        }

        let count = self.evict_batch.max(len - self.max_entries).min(len - 1);
        let mut evicted = Vec::with_capacity(count);
        for _ in 0..count {
            match self.entries.pop_lru() {
                Some(entry) => evicted.push(entry),
                None => break,
            }
        }
        evicted
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.pop(key)
    }

    /// Drop every entry whose key matches `predicate`
    pub fn remove_where(&mut self, mut predicate: impl FnMut(&K) -> bool) -> usize {
        let doomed: Vec<K> =
            self.entries.iter().filter(|(key, _)| predicate(key)).map(|(key, _)| key.clone()).collect();
        for key in &doomed {
            self.entries.pop(key);
        }
        doomed.len()
    }

    /// Keys from most- to least-recently-used
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn evict_batch(&self) -> usize {
        self.evict_batch
    }
}
