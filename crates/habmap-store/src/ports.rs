use habmap_core::models::{LayerDescriptor, NormalizedGeometryTable};
use habmap_core::Result;
use habmap_geo::GeometryNormalizer;

/// Port for loading a layer's full-resolution geometry
pub trait GeometrySource: Send + Sync {
    /// Load and normalize the layer a descriptor points at
    fn load(&self, layer: &LayerDescriptor) -> Result<NormalizedGeometryTable>;
}

impl GeometrySource for GeometryNormalizer {
    fn load(&self, layer: &LayerDescriptor) -> Result<NormalizedGeometryTable> {
        self.normalize(layer)
    }
}
