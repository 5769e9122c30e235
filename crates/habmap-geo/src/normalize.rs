//! Geometry Normalizer
//!
//! Loads a layer's full feature table and brings it into the canonical
//! display system: WGS 84 geographic degrees, two dimensions only.

use std::path::Path;
use std::time::Instant;

use habmap_core::formats::{Dimensions, FormatRegistry, ReadOptions, SourceLayer};
use habmap_core::models::{Crs, LayerDescriptor, NormalizedGeometryTable, TableFeature};
use habmap_core::{HabmapError, Result};

use crate::convert::{force_2d, has_elevation, to_planar};
use crate::transform::{crs_match, Reprojector};
use crate::validation::count_invalid_geometries;

/// Reads layers from disk and normalizes them
pub struct GeometryNormalizer {
    registry: FormatRegistry,
    target: Crs,
}

impl GeometryNormalizer {
    pub fn new(registry: FormatRegistry) -> Self {
        Self { registry, target: Crs::wgs84() }
    }

    pub fn with_default_readers() -> Self {
        Self::new(FormatRegistry::with_default_readers())
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    /// Normalize the layer a descriptor points at
    pub fn normalize(&self, descriptor: &LayerDescriptor) -> Result<NormalizedGeometryTable> {
        self.normalize_layer(&descriptor.file_path, &descriptor.layer_name)
    }

    /// Read `layer` from `path` and normalize it.
    ///
    /// Any failure to open, parse, or reproject the source is reported as
    /// `DataUnavailable`.
    pub fn normalize_layer(&self, path: &Path, layer: &str) -> Result<NormalizedGeometryTable> {
        let started = Instant::now();

        let reader = self.registry.detect_format(path).map_err(|e| unavailable(path, e))?;
        let source = reader
            .read_layer(path, layer, ReadOptions { force_2d: true })
            .map_err(|e| unavailable(path, e))?;

        let features = self.convert_features(path, source)?;
        let table = NormalizedGeometryTable::new(features);

        tracing::debug!(
            path = %path.display(),
            layer,
            features = table.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Normalized layer"
        );

        Ok(table)
    }

    fn convert_features(&self, path: &Path, source: SourceLayer) -> Result<Vec<TableFeature>> {
        // Readers that cannot strip elevation themselves get one scan for the
        // whole table; per-geometry conversion only runs when it found some.
        let strip_elevation = source.dimensions == Dimensions::Unknown
            && source
                .features
                .iter()
                .filter_map(|f| f.geometry.as_ref())
                .any(|g| has_elevation(&g.value));

        if strip_elevation {
            tracing::debug!(layer = %source.name, "Source carries elevation, converting geometries to 2D");
        }

        let reprojector = if crs_match(&source.crs, &self.target) {
            None
        } else {
            tracing::info!(
                layer = %source.name,
                from = %source.crs,
                to = %self.target,
                "Reprojecting layer"
            );
            Some(Reprojector::new(&source.crs, &self.target).map_err(|e| unavailable(path, e))?)
        };

        let mut features = Vec::with_capacity(source.features.len());
        let mut dropped = 0usize;

        for (index, feature) in source.features.into_iter().enumerate() {
            let Some(geometry) = feature.geometry else {
                dropped += 1;
                continue;
            };

            let value = if strip_elevation { force_2d(&geometry.value) } else { geometry.value };

            let planar = to_planar(&value).map_err(|reason| {
                HabmapError::unavailable(path, format!("feature {}: {}", index, reason))
            })?;

            let geometry = match &reprojector {
                Some(reprojector) => reprojector.reproject(&planar).map_err(|reason| {
                    HabmapError::unavailable(path, format!("feature {}: {}", index, reason))
                })?,
                None => planar,
            };

            features.push(TableFeature { geometry, attributes: feature.attributes });
        }

        if dropped > 0 {
            tracing::warn!(layer = %source.name, dropped, "Dropped features without geometry");
        }

        let invalid = count_invalid_geometries(features.iter().map(|f| &f.geometry));
        if invalid > 0 {
            tracing::warn!(layer = %source.name, invalid, "Layer has invalid geometries, their areas will be omitted");
        }

        Ok(features)
    }
}

impl Default for GeometryNormalizer {
    fn default() -> Self {
        Self::with_default_readers()
    }
}

fn unavailable(path: &Path, error: HabmapError) -> HabmapError {
    match error {
        HabmapError::DataUnavailable { .. } => error,
        other => HabmapError::unavailable(path, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::CoordsIter;
    use std::fs;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_strips_elevation_and_drops_null_geometry() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write(
            &temp_dir,
            "reef.geojson",
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"id": 1},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0,3],[1,0,3],[1,1,3],[0,0,3]]]}},
                {"type": "Feature", "properties": {"id": 2}, "geometry": null}
            ]}"#,
        );

        let table = GeometryNormalizer::default().normalize_layer(&path, "reef").unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.features()[0].geometry.coords_count(), 4);
        assert_eq!(table.bounds().unwrap().to_array(), [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_reprojects_web_mercator() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write(
            &temp_dir,
            "merc.geojson",
            r#"{"type": "FeatureCollection",
                "crs": {"type": "name", "properties": {"name": "EPSG:3857"}},
                "features": [{"type": "Feature", "properties": {},
                 "geometry": {"type": "Polygon", "coordinates":
                   [[[0,0],[111319.490793,0],[111319.490793,111325.142866],[0,0]]]}}]}"#,
        );

        let table = GeometryNormalizer::default().normalize_layer(&path, "merc").unwrap();
        let bounds = table.bounds().unwrap();

        assert!((bounds.max_lon - 1.0).abs() < 1e-6);
        assert!((bounds.max_lat - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let err = GeometryNormalizer::default()
            .normalize_layer(Path::new("/nonexistent/gone.geojson"), "gone")
            .unwrap_err();
        assert!(matches!(err, HabmapError::DataUnavailable { .. }));
    }

    #[test]
    fn test_unknown_crs_is_unavailable() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write(
            &temp_dir,
            "lambert.geojson",
            r#"{"type": "FeatureCollection",
                "crs": {"type": "name", "properties": {"name": "EPSG:2154"}},
                "features": [{"type": "Feature", "properties": {},
                 "geometry": {"type": "Point", "coordinates": [700000, 6600000]}}]}"#,
        );

        let err = GeometryNormalizer::default().normalize_layer(&path, "lambert").unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_malformed_coordinates_abort_layer() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write(
            &temp_dir,
            "bad.geojson",
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Point", "coordinates": [1]}}]}"#,
        );

        let err = GeometryNormalizer::default().normalize_layer(&path, "bad");
        assert!(matches!(err, Err(HabmapError::DataUnavailable { .. })));
    }
}
