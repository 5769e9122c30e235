//! GeoJSON format reader implementation
//!
//! A GeoJSON file holds a single layer named after the file stem. The source
//! CRS comes from the legacy `crs` member when present. Positions are passed
//! through untouched, so a 3D file yields 3D positions.

use geojson::{Feature, GeoJson, Geometry, Value};
use std::fs;
use std::path::Path;

use crate::error::{HabmapError, Result};
use crate::formats::{
    file_stem, parse_crs_name, Dimensions, FormatReader, LayerHeader, ReadOptions,
    SourceFeature, SourceLayer,
};
use crate::models::{AttributeValue, Attributes, Crs, GeometryKind};

/// GeoJSON format reader
pub struct GeoJsonReader;

impl FormatReader for GeoJsonReader {
    fn supported_extensions(&self) -> &[&str] {
        &["geojson", "json"]
    }

    fn format_name(&self) -> &str {
        "GeoJSON"
    }

    fn layer_names(&self, path: &Path) -> Result<Vec<String>> {
        Ok(vec![file_stem(path)])
    }

    fn layer_header(&self, path: &Path, layer: &str) -> Result<LayerHeader> {
        self.check_layer(path, layer)?;
        let (features, crs) = self.parse(path)?;

        // Features without geometry are not served, so they are not counted
        let mut kind = GeometryKind::Unknown;
        let mut extent = Extent::default();
        let mut feature_count = 0;
        for geometry in features.iter().filter_map(|f| f.geometry.as_ref()) {
            kind = kind.merge(kind_of(&geometry.value));
            for_each_position(&geometry.value, &mut |p| extent.add(p));
            feature_count += 1;
        }

        Ok(LayerHeader { kind, feature_count, extent: extent.to_rect(), crs })
    }

    fn read_layer(&self, path: &Path, layer: &str, _options: ReadOptions) -> Result<SourceLayer> {
        self.check_layer(path, layer)?;
        let (features, crs) = self.parse(path)?;

        let features = features
            .into_iter()
            .map(|feature| SourceFeature {
                attributes: convert_properties(&feature),
                geometry: feature.geometry,
            })
            .collect();

        Ok(SourceLayer {
            name: layer.to_string(),
            crs,
            dimensions: Dimensions::Unknown,
            features,
        })
    }
}

impl GeoJsonReader {
    fn check_layer(&self, path: &Path, layer: &str) -> Result<()> {
        if file_stem(path) == layer {
            Ok(())
        } else {
            Err(HabmapError::LayerNotFound { id: format!("{}/{}", path.display(), layer) })
        }
    }

    /// Parse the file into its features and source CRS
    fn parse(&self, path: &Path) -> Result<(Vec<Feature>, Crs)> {
        let content = fs::read_to_string(path)
            .map_err(|e| HabmapError::unavailable(path, format!("Failed to read GeoJSON: {}", e)))?;

        let geojson: GeoJson = content.parse().map_err(|e| {
            HabmapError::unavailable(path, format!("Failed to parse GeoJSON: {}", e))
        })?;

        match geojson {
            GeoJson::FeatureCollection(fc) => {
                let epsg = fc
                    .foreign_members
                    .as_ref()
                    .and_then(|fm| fm.get("crs"))
                    .and_then(extract_epsg_from_crs)
                    .unwrap_or(4326);
                Ok((fc.features, Crs::from_epsg(epsg)))
            }
            GeoJson::Feature(feature) => Ok((vec![feature], Crs::wgs84())),
            GeoJson::Geometry(geometry) => Ok((
                vec![Feature {
                    bbox: None,
                    geometry: Some(geometry),
                    id: None,
                    properties: None,
                    foreign_members: None,
                }],
                Crs::wgs84(),
            )),
        }
    }
}

/// Extract EPSG code from a legacy CRS object
fn extract_epsg_from_crs(crs: &serde_json::Value) -> Option<u32> {
    crs.get("properties")
        .and_then(|props| props.get("name"))
        .and_then(|name| name.as_str())
        .and_then(parse_crs_name)
}

fn convert_properties(feature: &Feature) -> Attributes {
    feature
        .properties
        .iter()
        .flatten()
        .map(|(key, value)| (key.clone(), AttributeValue::from_json(value)))
        .collect()
}

/// Geometry kind of a GeoJSON value
fn kind_of(value: &Value) -> GeometryKind {
    match value {
        Value::Point(_) => GeometryKind::Point,
        Value::MultiPoint(_) => GeometryKind::MultiPoint,
        Value::LineString(_) => GeometryKind::LineString,
        Value::MultiLineString(_) => GeometryKind::MultiLineString,
        Value::Polygon(_) => GeometryKind::Polygon,
        Value::MultiPolygon(_) => GeometryKind::MultiPolygon,
        Value::GeometryCollection(_) => GeometryKind::GeometryCollection,
    }
}

/// Visit every position of a geometry value
fn for_each_position(value: &Value, visit: &mut impl FnMut(&[f64])) {
    match value {
        Value::Point(p) => visit(p),
        Value::MultiPoint(points) | Value::LineString(points) => {
            points.iter().for_each(|p| visit(p))
        }
        Value::MultiLineString(lines) | Value::Polygon(lines) => {
            lines.iter().flatten().for_each(|p| visit(p))
        }
        Value::MultiPolygon(polygons) => {
            polygons.iter().flatten().flatten().for_each(|p| visit(p))
        }
        Value::GeometryCollection(geometries) => {
            geometries.iter().for_each(|g: &Geometry| for_each_position(&g.value, visit))
        }
    }
}

/// Running min/max over visited positions
#[derive(Default)]
struct Extent {
    bounds: Option<(f64, f64, f64, f64)>,
}

impl Extent {
    fn add(&mut self, position: &[f64]) {
        let (x, y) = match position {
            [x, y, ..] if x.is_finite() && y.is_finite() => (*x, *y),
            _ => return,
        };
        self.bounds = Some(match self.bounds {
            None => (x, y, x, y),
            Some((min_x, min_y, max_x, max_y)) => {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            }
        });
    }

    fn to_rect(&self) -> Option<geo::Rect<f64>> {
        self.bounds.map(|(min_x, min_y, max_x, max_y)| {
            geo::Rect::new(geo::coord! { x: min_x, y: min_y }, geo::coord! { x: max_x, y: max_y })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AREAS: &str = r#"{
        "type": "FeatureCollection",
        "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3857"}},
        "features": [
            {
                "type": "Feature",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0, 0, 5], [10, 0, 5], [10, 10, 5], [0, 0, 5]]]
                },
                "properties": {"name": "North", "code": 7}
            },
            {
                "type": "Feature",
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[-5, -2], [0, -2], [0, 3], [-5, -2]]]]
                },
                "properties": {"name": "South"}
            },
            {"type": "Feature", "geometry": null, "properties": {}}
        ]
    }"#;

    fn write_fixture(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_layer_names_use_file_stem() {
        let reader = GeoJsonReader;
        let names = reader.layer_names(Path::new("/data/marine_areas.geojson")).unwrap();
        assert_eq!(names, vec!["marine_areas".to_string()]);
    }

    #[test]
    fn test_layer_header() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&temp_dir, "areas.geojson", AREAS);

        let header = GeoJsonReader.layer_header(&path, "areas").unwrap();

        assert_eq!(header.kind, GeometryKind::MultiPolygon);
        // The null-geometry feature is left out
        assert_eq!(header.feature_count, 2);
        assert_eq!(header.crs.epsg, 3857);

        let extent = header.extent.unwrap();
        assert_eq!(extent.min(), geo::coord! { x: -5.0, y: -2.0 });
        assert_eq!(extent.max(), geo::coord! { x: 10.0, y: 10.0 });
    }

    #[test]
    fn test_read_layer_keeps_elevation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&temp_dir, "areas.geojson", AREAS);

        let layer = GeoJsonReader.read_layer(&path, "areas", ReadOptions::default()).unwrap();

        assert_eq!(layer.dimensions, Dimensions::Unknown);
        assert_eq!(layer.features.len(), 3);
        assert_eq!(layer.features[0].attributes["code"], AttributeValue::Integer(7));
        assert!(layer.features[2].geometry.is_none());

        match &layer.features[0].geometry.as_ref().unwrap().value {
            Value::Polygon(rings) => assert_eq!(rings[0][0].len(), 3),
            other => panic!("unexpected geometry: {:?}", other),
        }
    }

    #[test]
    fn test_default_crs_and_single_feature() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            &temp_dir,
            "site.geojson",
            r#"{"type": "Feature", "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}, "properties": null}"#,
        );

        let layer = GeoJsonReader.read_layer(&path, "site", ReadOptions::default()).unwrap();
        assert_eq!(layer.crs, Crs::wgs84());
        assert_eq!(layer.features.len(), 1);
        assert!(layer.features[0].attributes.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_unavailable() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&temp_dir, "broken.geojson", "{ not geojson");

        let err = GeoJsonReader.layer_header(&path, "broken").unwrap_err();
        assert!(err.is_unavailable());
        assert!(err.to_string().contains("Failed to parse GeoJSON"), "{}", err);
    }

    #[test]
    fn test_unknown_layer() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&temp_dir, "areas.geojson", AREAS);

        let err = GeoJsonReader.layer_header(&path, "other").unwrap_err();
        assert!(err.is_not_found());
    }
}
