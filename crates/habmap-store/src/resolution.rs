//! Resolution Cache
//!
//! Holds normalized full-resolution tables keyed by source path and layer
//! name. Lookups, inserts and evictions for one cache instance happen under
//! a single lock; normalization itself runs outside it so that one slow
//! layer does not stall hits on the others.

use std::sync::{Arc, Mutex, MutexGuard};

use habmap_core::config::CacheSettings;
use habmap_core::models::{LayerDescriptor, NormalizedGeometryTable};
use habmap_core::Result;

use crate::batch_lru::BatchLru;
use crate::ports::GeometrySource;
use crate::stats::CacheStats;

type EvictionListener = Box<dyn Fn(&[String]) + Send + Sync>;

struct Inner {
    entries: BatchLru<String, Arc<NormalizedGeometryTable>>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

pub struct ResolutionCache<S> {
    source: S,
    inner: Mutex<Inner>,
    on_evict: Option<EvictionListener>,
}

impl<S: GeometrySource> ResolutionCache<S> {
    pub fn new(source: S, settings: CacheSettings) -> Self {
        Self {
            source,
            inner: Mutex::new(Inner {
                entries: BatchLru::new(settings.max_entries, settings.evict_batch),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
            on_evict: None,
        }
    }

    /// Call `listener` with the keys of every evicted batch
    pub fn with_eviction_listener(mut self, listener: impl Fn(&[String]) + Send + Sync + 'static) -> Self {
        self.on_evict = Some(Box::new(listener));
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Full-resolution table for `layer`, loading it on a miss.
    ///
    /// The returned table is shared with the cache. Load failures are
    /// returned as-is and leave the cache untouched.
    pub fn get(&self, layer: &LayerDescriptor) -> Result<Arc<NormalizedGeometryTable>> {
        let key = layer.cache_key();

        {
            let mut inner = self.lock();
            if let Some(table) = inner.entries.get(&key).cloned() {
                inner.hits += 1;
                tracing::debug!(layer = %layer.id, "Resolution cache hit");
                return Ok(table);
            }
            inner.misses += 1;
        }

        tracing::debug!(layer = %layer.id, "Resolution cache miss");
        let table = Arc::new(self.source.load(layer)?);

        let (table, evicted, remaining) = {
            let mut inner = self.lock();
            // Another worker may have loaded the same layer meanwhile
            if let Some(existing) = inner.entries.get(&key).cloned() {
                return Ok(existing);
            }
            let evicted = inner.entries.insert(key, Arc::clone(&table));
            inner.evictions += evicted.len() as u64;
            let remaining = inner.entries.len();
            (table, evicted, remaining)
        };

        if !evicted.is_empty() {
            let keys: Vec<String> = evicted.into_iter().map(|(key, _)| key).collect();
            tracing::info!(evicted = keys.len(), remaining, "Evicted layers from resolution cache");
            if let Some(listener) = &self.on_evict {
                listener(&keys);
            }
        }

        Ok(table)
    }

    /// Whether `layer` is currently held, without touching its position
    pub fn contains(&self, layer: &LayerDescriptor) -> bool {
        self.lock().entries.contains(&layer.cache_key())
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            entries: inner.entries.len(),
            max_entries: inner.entries.max_entries(),
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Entries are immutable Arcs, so a panic elsewhere cannot leave one half-written
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
