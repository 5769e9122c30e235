//! Vector layer service
//!
//! Owns the layer registry and both server caches, and answers the two
//! request-level operations: list the layers, and render one layer at a
//! tolerance.

use std::collections::HashMap;
use std::sync::Arc;

use habmap_core::config::{CacheSettings, LayeredConfig};
use habmap_core::models::{LayerDescriptor, Tier, ToleranceBucket};
use habmap_core::{HabmapError, Result};
use habmap_geo::GeometryNormalizer;
use habmap_store::{CacheStats, DocumentCache, DocumentKey, GeometrySource, ResolutionCache};
use serde::Serialize;

use crate::registry::{BoundsSummary, LayerRegistry};
use crate::scanner::DatasetScanner;
use crate::serializer::{serialize_layer, SerializedDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    pub layers: usize,
    pub tables: CacheStats,
    pub documents: CacheStats,
}

pub struct VectorLayerService<S = GeometryNormalizer> {
    registry: LayerRegistry,
    tables: ResolutionCache<S>,
    documents: Arc<DocumentCache<SerializedDocument>>,
    simplify_tolerance: f64,
}

impl VectorLayerService<GeometryNormalizer> {
    /// Scan the configured dataset directory and build the service
    pub fn initialize(config: &LayeredConfig) -> Result<Self> {
        config.validate()?;

        if !config.vector_enabled.value {
            return Err(HabmapError::ServiceUnavailable {
                reason: "vector layers are disabled".to_string(),
            });
        }

        let data_dir = &config.data_dir.value;
        if !data_dir.is_dir() {
            return Err(HabmapError::ServiceUnavailable {
                reason: format!("dataset directory {} does not exist", data_dir.display()),
            });
        }

        let normalizer = GeometryNormalizer::default();
        let registry = DatasetScanner::new(&normalizer).scan(data_dir);

        tracing::info!(
            data_dir = %data_dir.display(),
            layers = registry.len(),
            "Vector layer service initialized"
        );

        Ok(Self::new(registry, normalizer, config.cache_settings(), config.simplify_tolerance.value))
    }
}

impl<S: GeometrySource> VectorLayerService<S> {
    pub fn new(
        registry: LayerRegistry,
        source: S,
        settings: CacheSettings,
        simplify_tolerance: f64,
    ) -> Self {
        let documents = Arc::new(DocumentCache::new(settings));

        // Evicting a table drops its documents too
        let ids: HashMap<String, String> = registry
            .layers()
            .iter()
            .map(|layer| (layer.cache_key(), layer.id.as_str().to_string()))
            .collect();
        let coupled = Arc::clone(&documents);
        let tables = ResolutionCache::new(source, settings).with_eviction_listener(move |keys| {
            for key in keys {
                if let Some(id) = ids.get(key) {
                    coupled.invalidate_layer(id);
                }
            }
        });

        Self { registry, tables, documents, simplify_tolerance }
    }

    /// Every registered layer in scan order
    pub fn list_layers(&self) -> &[LayerDescriptor] {
        self.registry.layers()
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    /// Look up a layer by id or display name
    pub fn layer(&self, id: &str) -> Result<&LayerDescriptor> {
        self.registry.get(id).ok_or_else(|| HabmapError::LayerNotFound { id: id.to_string() })
    }

    /// Render `id` at `tolerance` degrees (full resolution when `None` or
    /// non-positive).
    ///
    /// Unknown layers are `LayerNotFound`; layers whose source can no longer
    /// be read are `DataUnavailable`.
    pub fn get_layer_document(
        &self,
        id: &str,
        tolerance: Option<f64>,
    ) -> Result<Arc<SerializedDocument>> {
        let layer = self.layer(id)?;
        let bucket = ToleranceBucket::from_tolerance(tolerance);
        let key = DocumentKey::new(layer.id.as_str(), bucket);

        self.documents.get_or_try_insert_with(key, || {
            let table = self.tables.get(layer)?;
            serialize_layer(layer, &table, bucket.tolerance())
        })
    }

    /// Render `id` at the tolerance a display tier maps to
    pub fn document_for_tier(&self, id: &str, tier: Tier) -> Result<Arc<SerializedDocument>> {
        self.get_layer_document(id, tier.tolerance(self.simplify_tolerance))
    }

    pub fn bounds_summary(&self) -> BoundsSummary {
        self.registry.bounds_summary()
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            layers: self.registry.len(),
            tables: self.tables.stats(),
            documents: self.documents.stats(),
        }
    }
}
