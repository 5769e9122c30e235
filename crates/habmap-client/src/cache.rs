//! Client-side document cache

use std::num::NonZeroUsize;
use std::sync::Arc;

use habmap_core::models::Tier;
use lru::LruCache;

use crate::fetcher::LayerDocument;

/// Least-recently-used documents keyed by layer and tier
pub struct ClientLayerCache {
    entries: LruCache<(String, Tier), Arc<LayerDocument>>,
}

impl ClientLayerCache {
    /// A zero capacity is raised to one
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self { entries: LruCache::new(capacity) }
    }

    /// Look up a document, marking it most recently used
    pub fn get(&mut self, layer: &str, tier: Tier) -> Option<Arc<LayerDocument>> {
        self.entries.get(&(layer.to_string(), tier)).cloned()
    }

    /// Presence check that leaves the recency order alone
    pub fn contains(&self, layer: &str, tier: Tier) -> bool {
        self.entries.contains(&(layer.to_string(), tier))
    }

    pub fn insert(&mut self, layer: &str, tier: Tier, document: Arc<LayerDocument>) {
        let key = (layer.to_string(), tier);
        // `push` also hands back the old value when the key was already present
        if let Some((evicted, _)) = self.entries.push(key.clone(), document) {
            if evicted != key {
                tracing::debug!(layer = %evicted.0, tier = %evicted.1, "Evicted cached layer");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}
