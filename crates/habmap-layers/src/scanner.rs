//! Dataset Scanner
//!
//! Walks the dataset directory once at startup and builds descriptors from
//! layer headers. Anything that cannot be read is skipped with a warning.
//!
//! Layers already in WGS 84 are described from their headers alone. Projected
//! layers are normalized once so their bounds match the served geometry.

use std::fs;
use std::path::{Path, PathBuf};

use habmap_core::formats::{FormatReader, FormatRegistry};
use habmap_core::models::{display_name, Bounds, LayerDescriptor, LayerId, LayerStyle};
use habmap_core::{HabmapError, Result};
use habmap_geo::GeometryNormalizer;

use crate::registry::LayerRegistry;

const CATEGORY: &str = "vector";

pub struct DatasetScanner<'a> {
    normalizer: &'a GeometryNormalizer,
}

impl<'a> DatasetScanner<'a> {
    pub fn new(normalizer: &'a GeometryNormalizer) -> Self {
        Self { normalizer }
    }

    fn formats(&self) -> &FormatRegistry {
        self.normalizer.registry()
    }

    /// Scan `dir` (non-recursively) and build the layer registry
    pub fn scan(&self, dir: &Path) -> LayerRegistry {
        let files = match self.dataset_files(dir) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Cannot read dataset directory");
                return LayerRegistry::empty();
            }
        };

        tracing::info!(dir = %dir.display(), files = files.len(), "Discovered dataset files");

        let mut layers = Vec::new();
        for path in &files {
            match self.scan_file(path) {
                Ok(found) => layers.extend(found),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable dataset")
                }
            }
        }

        tracing::info!(layers = layers.len(), "Dataset scan complete");
        LayerRegistry::new(layers)
    }

    /// Supported files directly under `dir`, sorted by name
    fn dataset_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && self.formats().is_supported(path))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Descriptors for every readable, non-empty layer of one file
    pub fn scan_file(&self, path: &Path) -> Result<Vec<LayerDescriptor>> {
        let reader = self.formats().detect_format(path)?;

        let validation = reader.validate(path);
        for warning in &validation.warnings {
            tracing::warn!(path = %path.display(), "{}", warning);
        }
        if !validation.is_valid() {
            return Err(HabmapError::unavailable(path, validation.errors.join("; ")));
        }

        let mut descriptors = Vec::new();
        for layer in reader.layer_names(path)? {
            match self.describe(reader, path, &layer) {
                Ok(Some(descriptor)) => descriptors.push(descriptor),
                Ok(None) => {}
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    layer = %layer,
                    error = %e,
                    "Skipping unreadable layer"
                ),
            }
        }
        Ok(descriptors)
    }

    fn describe(
        &self,
        reader: &dyn FormatReader,
        path: &Path,
        layer: &str,
    ) -> Result<Option<LayerDescriptor>> {
        let header = reader.layer_header(path, layer)?;

        let extent = match (header.feature_count, header.extent) {
            (0, _) | (_, None) => {
                tracing::warn!(path = %path.display(), layer, "Skipping empty layer");
                return Ok(None);
            }
            (_, Some(extent)) => extent,
        };

        let (feature_count, bounds) = if header.crs.is_wgs84() {
            (header.feature_count, Bounds::from_rect(extent))
        } else {
            let table = self.normalizer.normalize_layer(path, layer)?;
            match table.bounds() {
                Some(bounds) => (table.len(), bounds),
                None => {
                    tracing::warn!(path = %path.display(), layer, "Skipping empty layer");
                    return Ok(None);
                }
            }
        };

        let source_file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Some(LayerDescriptor {
            id: LayerId::new(&source_file, layer),
            file_path: path.to_path_buf(),
            layer_name: layer.to_string(),
            display_name: display_name(&file_stem, layer),
            geometry_type: header.kind,
            feature_count,
            bounds,
            crs: header.crs,
            source_file,
            category: CATEGORY.to_string(),
            style: LayerStyle::for_kind(header.kind),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use habmap_core::models::{Crs, GeometryKind};

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    const SQUARE: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"name": "a"},
         "geometry": {"type": "Polygon", "coordinates": [[[0,0],[2,0],[2,1],[0,0]]]}}]}"#;

    #[test]
    fn test_scan_skips_corrupt_and_unsupported_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(temp_dir.path(), "marine_areas.geojson", SQUARE);
        write(temp_dir.path(), "broken.geojson", "{ not json");
        write(temp_dir.path(), "notes.txt", "ignored");
        fs::create_dir(temp_dir.path().join("nested.geojson")).unwrap();

        let normalizer = GeometryNormalizer::default();
        let registry = DatasetScanner::new(&normalizer).scan(temp_dir.path());

        assert_eq!(registry.len(), 1);
        let layer = &registry.layers()[0];
        assert_eq!(layer.id.as_str(), "marine_areas.geojson/marine_areas");
        assert_eq!(layer.display_name, "Marine Areas");
        assert_eq!(layer.geometry_type, GeometryKind::Polygon);
        assert_eq!(layer.feature_count, 1);
        assert_eq!(layer.bounds.to_array(), [0.0, 0.0, 2.0, 1.0]);
        assert_eq!(layer.style, LayerStyle::polygon());
        assert_eq!(layer.category, "vector");
    }

    #[test]
    fn test_scan_skips_empty_layers() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(temp_dir.path(), "empty.geojson", r#"{"type": "FeatureCollection", "features": []}"#);

        let normalizer = GeometryNormalizer::default();
        assert!(DatasetScanner::new(&normalizer).scan(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_scan_missing_directory_is_empty() {
        let normalizer = GeometryNormalizer::default();
        let registry = DatasetScanner::new(&normalizer).scan(Path::new("/nonexistent/habmap"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_projected_bounds_are_reported_in_degrees() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(
            temp_dir.path(),
            "survey.geojson",
            r#"{"type": "FeatureCollection",
                "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3857"}},
                "features": [{"type": "Feature", "properties": {},
                 "geometry": {"type": "Polygon", "coordinates":
                   [[[0,0],[111319.490793,0],[111319.490793,111325.142866],[0,0]]]}}]}"#,
        );

        let normalizer = GeometryNormalizer::default();
        let registry = DatasetScanner::new(&normalizer).scan(temp_dir.path());
        let layer = &registry.layers()[0];

        assert_eq!(layer.crs, Crs::web_mercator());
        assert!(layer.bounds.approx_eq(&Bounds::new(0.0, 0.0, 1.0, 1.0), 1e-6));
    }

    #[test]
    fn test_projected_bounds_match_normalized_geometry() {
        let temp_dir = tempfile::tempdir().unwrap();
        // 200 km square in LAEA Europe, its edges bow once reprojected
        write(
            temp_dir.path(),
            "grid.geojson",
            r#"{"type": "FeatureCollection",
                "crs": {"type": "name", "properties": {"name": "EPSG:3035"}},
                "features": [{"type": "Feature", "properties": {},
                 "geometry": {"type": "Polygon", "coordinates":
                   [[[4321000,3210000],[4521000,3210000],[4521000,3410000],[4321000,3410000],[4321000,3210000]]]}}]}"#,
        );

        let normalizer = GeometryNormalizer::default();
        let registry = DatasetScanner::new(&normalizer).scan(temp_dir.path());
        let layer = &registry.layers()[0];
        let table = normalizer.normalize(layer).unwrap();

        assert_eq!(layer.feature_count, table.len());
        assert!(layer.bounds.approx_eq(&table.bounds().unwrap(), 1e-12), "{:?}", layer.bounds);
    }

    #[test]
    fn test_unsupported_crs_is_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(
            temp_dir.path(),
            "lambert.geojson",
            r#"{"type": "FeatureCollection",
                "crs": {"type": "name", "properties": {"name": "EPSG:2154"}},
                "features": [{"type": "Feature", "properties": {},
                 "geometry": {"type": "Point", "coordinates": [700000, 6600000]}}]}"#,
        );
        write(temp_dir.path(), "zones.geojson", SQUARE);

        let normalizer = GeometryNormalizer::default();
        let registry = DatasetScanner::new(&normalizer).scan(temp_dir.path());

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.layers()[0].layer_name, "zones");
    }
}
