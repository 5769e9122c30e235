//! Cache of serialized layer documents, one per (layer, tolerance bucket)

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use habmap_core::config::CacheSettings;
use habmap_core::models::ToleranceBucket;
use habmap_core::Result;

use crate::batch_lru::BatchLru;
use crate::stats::CacheStats;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    pub layer: String,
    pub bucket: ToleranceBucket,
}

impl DocumentKey {
    pub fn new(layer: impl Into<String>, bucket: ToleranceBucket) -> Self {
        Self { layer: layer.into(), bucket }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.layer, self.bucket)
    }
}

struct Inner<D> {
    entries: BatchLru<DocumentKey, Arc<D>>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Bounded cache of rendered documents
pub struct DocumentCache<D> {
    inner: Mutex<Inner<D>>,
}

impl<D> DocumentCache<D> {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: BatchLru::new(settings.document_max_entries, settings.evict_batch),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
        }
    }

    pub fn get(&self, key: &DocumentKey) -> Option<Arc<D>> {
        let mut inner = self.lock();
        match inner.entries.get(key).cloned() {
            Some(document) => {
                inner.hits += 1;
                tracing::debug!(document = %key, "Document cache hit");
                Some(document)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Store a document, keeping the one already present if another worker
    /// got there first
    pub fn insert(&self, key: DocumentKey, document: D) -> Arc<D> {
        let mut inner = self.lock();
        if let Some(existing) = inner.entries.get(&key).cloned() {
            return existing;
        }

        let document = Arc::new(document);
        let evicted = inner.entries.insert(key, Arc::clone(&document));
        if !evicted.is_empty() {
            inner.evictions += evicted.len() as u64;
            tracing::info!(
                evicted = evicted.len(),
                remaining = inner.entries.len(),
                "Evicted documents from document cache"
            );
        }
        document
    }

    /// Cached document for `key`, building it with `build` on a miss.
    ///
    /// `build` runs without the lock held; errors are returned uncached.
    pub fn get_or_try_insert_with(
        &self,
        key: DocumentKey,
        build: impl FnOnce() -> Result<D>,
    ) -> Result<Arc<D>> {
        if let Some(document) = self.get(&key) {
            return Ok(document);
        }
        let document = build()?;
        Ok(self.insert(key, document))
    }

    /// Drop every tolerance of `layer`
    pub fn invalidate_layer(&self, layer: &str) -> usize {
        let removed = self.lock().entries.remove_where(|key| key.layer == layer);
        if removed > 0 {
            tracing::debug!(layer, removed, "Dropped cached documents for evicted layer");
        }
        removed
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

    fn lock(&self) -> MutexGuard<'_, Inner<D>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
