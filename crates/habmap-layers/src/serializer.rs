//! Simplification & Serialization Engine
//!
//! Turns a normalized table into a GeoJSON FeatureCollection carrying
//! per-feature geodesic areas and a `metadata` member describing the layer.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use habmap_core::models::{Bounds, GeometryKind, LayerDescriptor, LayerId, LayerStyle, NormalizedGeometryTable};
use habmap_core::{HabmapError, Result};
use habmap_geo::convert::to_geojson;
use habmap_geo::{geodesic_area_km2, simplify_table};
use serde::{Serialize, Serializer};

pub const AREA_PROPERTY: &str = "area_km2";

/// Layer description attached to every document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentMetadata {
    pub layer_name: String,
    pub display_name: String,
    pub geometry_type: GeometryKind,
    pub feature_count: usize,
    pub bounds: Bounds,
    pub source_file: String,
    pub style: LayerStyle,
    /// `None` for full resolution
    pub tolerance: Option<f64>,
}

/// A layer rendered at one tolerance
#[derive(Debug, Clone)]
pub struct SerializedDocument {
    pub layer: LayerId,
    pub metadata: DocumentMetadata,
    pub collection: FeatureCollection,
    /// Features whose simplification failed and were emitted at full resolution
    pub fallbacks: usize,
}

impl SerializedDocument {
    pub fn tolerance(&self) -> Option<f64> {
        self.metadata.tolerance
    }

    pub fn feature_count(&self) -> usize {
        self.collection.features.len()
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(&self.collection).map_err(|e| HabmapError::Serialization(e.to_string()))
    }
}

impl Serialize for SerializedDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.collection.serialize(serializer)
    }
}

/// Serialize `table` for `layer`, simplified at `tolerance` degrees when given.
///
/// The source table is never modified. Features whose area cannot be
/// computed are emitted without `area_km2`.
pub fn serialize_layer(
    layer: &LayerDescriptor,
    table: &NormalizedGeometryTable,
    tolerance: Option<f64>,
) -> Result<SerializedDocument> {
    let simplified;
    let (source, fallbacks) = match tolerance {
        Some(tolerance) => {
            simplified = simplify_table(table, tolerance);
            (&simplified.table, simplified.fallbacks)
        }
        None => (table, 0),
    };

    let features: Vec<Feature> = source
        .features()
        .iter()
        .enumerate()
        .map(|(index, feature)| {
            let mut properties: JsonObject =
                feature.attributes.iter().map(|(key, value)| (key.clone(), value.to_json())).collect();

            match geodesic_area_km2(&feature.geometry) {
                Ok(Some(area)) => {
                    properties.insert(AREA_PROPERTY.to_string(), JsonValue::from(area));
                }
                Ok(None) => {}
                Err(reason) => {
                    tracing::warn!(layer = %layer.id, feature = index, "Area unavailable: {}", reason);
                }
            }

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(to_geojson(&feature.geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let metadata = DocumentMetadata {
        layer_name: layer.layer_name.clone(),
        display_name: layer.display_name.clone(),
        geometry_type: layer.geometry_type,
        feature_count: features.len(),
        bounds: table.bounds().unwrap_or(layer.bounds),
        source_file: layer.source_file.clone(),
        style: layer.style.clone(),
        tolerance,
    };

    let mut foreign_members = JsonObject::new();
    foreign_members.insert(
        "metadata".to_string(),
        serde_json::to_value(&metadata).map_err(|e| HabmapError::Serialization(e.to_string()))?,
    );

    Ok(SerializedDocument {
        layer: layer.id.clone(),
        metadata,
        collection: FeatureCollection { bbox: None, features, foreign_members: Some(foreign_members) },
        fallbacks,
    })
}
