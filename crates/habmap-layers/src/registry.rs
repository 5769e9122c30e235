//! Immutable registry of the layers found at startup

use std::collections::HashMap;

use habmap_core::models::{Bounds, LayerDescriptor};
use serde::Serialize;

/// Extent of every registered layer; serializes to `{}` when empty
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoundsSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_bounds: Option<Bounds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_count: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct LayerRegistry {
    layers: Vec<LayerDescriptor>,
    by_id: HashMap<String, usize>,
}

impl LayerRegistry {
    /// Later duplicates of an id are dropped
    pub fn new(layers: Vec<LayerDescriptor>) -> Self {
        let mut kept = Vec::with_capacity(layers.len());
        let mut by_id = HashMap::new();

        for layer in layers {
            if by_id.contains_key(layer.id.as_str()) {
                tracing::warn!(layer = %layer.id, "Duplicate layer id, keeping the first");
                continue;
            }
            by_id.insert(layer.id.as_str().to_string(), kept.len());
            kept.push(layer);
        }

        Self { layers: kept, by_id }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Find a layer by id, falling back to its display name
    pub fn get(&self, key: &str) -> Option<&LayerDescriptor> {
        match self.by_id.get(key) {
            Some(&index) => self.layers.get(index),
            None => self.layers.iter().find(|layer| layer.display_name == key),
        }
    }

    /// Layers in scan order
    pub fn layers(&self) -> &[LayerDescriptor] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn bounds_summary(&self) -> BoundsSummary {
        let overall = self.layers.iter().map(|layer| layer.bounds).reduce(|a, b| a.union(&b));

        match overall {
            Some(bounds) => BoundsSummary {
                overall_bounds: Some(bounds),
                center: Some(bounds.center()),
                layer_count: Some(self.layers.len()),
            },
            None => BoundsSummary::default(),
        }
    }
}
