//! Shapefile format reader implementation
//!
//! This module provides support for reading ESRI Shapefiles using pure Rust.
//! Shapefiles consist of multiple component files (.shp, .shx, .dbf, .prj)
//! and hold exactly one layer, named after the file stem. The header read
//! used at scan time only touches the fixed-size .shp header and the length
//! of the .shx index, so no geometry is decoded.

use geojson::{Geometry, Value};
use shapefile::dbase::{FieldValue, Record};
use shapefile::{PolygonRing, Shape, ShapeReader, ShapeType};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{HabmapError, Result};
use crate::formats::validation::FormatValidator;
use crate::formats::{
    file_stem, Dimensions, FormatReader, FormatValidation, LayerHeader, ReadOptions,
    SourceFeature, SourceLayer,
};
use crate::models::{AttributeValue, Attributes, Crs, GeometryKind};

/// Length of the .shx header; each index record after it is 8 bytes
const SHX_HEADER_LEN: usize = 100;
const SHX_RECORD_LEN: usize = 8;

/// Content length, in 16-bit words, of a null shape record (the shape type alone)
const NULL_SHAPE_WORDS: u32 = 2;

/// Shapefile format reader
pub struct ShapefileReader;

impl FormatReader for ShapefileReader {
    fn supported_extensions(&self) -> &[&str] {
        &["shp"]
    }

    fn format_name(&self) -> &str {
        "Shapefile"
    }

    fn layer_names(&self, path: &Path) -> Result<Vec<String>> {
        Ok(vec![file_stem(path)])
    }

    fn layer_header(&self, path: &Path, layer: &str) -> Result<LayerHeader> {
        self.check_layer(path, layer)?;
        self.verify_components(path)?;

        let reader = ShapeReader::from_path(path).map_err(|e| {
            HabmapError::unavailable(path, format!("Failed to open Shapefile: {}", e))
        })?;
        let header = reader.header();

        let feature_count = self.count_from_index(path)?;
        let (min, max) = (&header.bbox.min, &header.bbox.max);
        let extent = if feature_count > 0
            && [min.x, min.y, max.x, max.y].iter().all(|v| v.is_finite())
            && min.x <= max.x
            && min.y <= max.y
        {
            Some(geo::Rect::new(geo::coord! { x: min.x, y: min.y }, geo::coord! { x: max.x, y: max.y }))
        } else {
            None
        };

        Ok(LayerHeader {
            kind: kind_of_shape_type(header.shape_type),
            feature_count,
            extent,
            crs: self.extract_crs(path)?,
        })
    }

    fn read_layer(&self, path: &Path, layer: &str, options: ReadOptions) -> Result<SourceLayer> {
        self.check_layer(path, layer)?;
        self.verify_components(path)?;

        let mut reader = shapefile::Reader::from_path(path).map_err(|e| {
            HabmapError::unavailable(path, format!("Failed to open Shapefile: {}", e))
        })?;

        let mut features = Vec::new();
        for result in reader.iter_shapes_and_records() {
            let (shape, record) = result.map_err(|e| {
                HabmapError::unavailable(path, format!("Failed to read feature {}: {}", features.len(), e))
            })?;

            features.push(SourceFeature {
                geometry: convert_shape(&shape, options.force_2d),
                attributes: extract_attributes(record),
            });
        }

        Ok(SourceLayer {
            name: layer.to_string(),
            crs: self.extract_crs(path)?,
            dimensions: if options.force_2d { Dimensions::Xy } else { Dimensions::Unknown },
            features,
        })
    }

    fn validate(&self, path: &Path) -> FormatValidation {
        let validation = FormatValidator::validate_file_exists(path);
        if !validation.is_valid() {
            return validation;
        }

        let component_validation = FormatValidator::validate_component_files(
            &path.with_extension(""),
            &["shp", "shx", "dbf"],
            &["prj"],
        );

        FormatValidator::merge_validations(vec![validation, component_validation])
    }
}

impl ShapefileReader {
    fn check_layer(&self, path: &Path, layer: &str) -> Result<()> {
        if file_stem(path) == layer {
            Ok(())
        } else {
            Err(HabmapError::LayerNotFound { id: format!("{}/{}", path.display(), layer) })
        }
    }

    /// Verify that all required Shapefile component files exist
    fn verify_components(&self, path: &Path) -> Result<()> {
        let validation = self.validate(path);
        FormatValidator::into_result(&validation, path)
    }

    /// Count of non-null shapes, read from the .shx index
    fn count_from_index(&self, path: &Path) -> Result<usize> {
        let shx = path.with_extension("shx");
        let index = fs::read(&shx)
            .map_err(|e| HabmapError::unavailable(&shx, format!("Failed to read index: {}", e)))?;

        count_non_null_records(&index).map_err(|reason| HabmapError::unavailable(shx, reason))
    }

    /// Extract CRS from the .prj file, defaulting to WGS 84
    fn extract_crs(&self, path: &Path) -> Result<Crs> {
        let prj_path: PathBuf = path.with_extension("prj");

        if !prj_path.exists() {
            return Ok(Crs::wgs84());
        }

        let prj_content = fs::read_to_string(&prj_path).map_err(|e| {
            HabmapError::unavailable(&prj_path, format!("Failed to read .prj file: {}", e))
        })?;

        match parse_epsg_from_wkt(&prj_content) {
            Some(epsg) => Ok(Crs::from_epsg(epsg)),
            None if prj_content.contains("GCS_WGS_1984") || prj_content.contains("\"WGS 84\"") => {
                Ok(Crs::wgs84())
            }
            None => Err(HabmapError::UnsupportedCrs {
                crs: prj_content.chars().take(80).collect(),
            }),
        }
    }
}

/// Count index records whose shape is not a null shape
fn count_non_null_records(index: &[u8]) -> std::result::Result<usize, String> {
    if index.len() < SHX_HEADER_LEN || (index.len() - SHX_HEADER_LEN) % SHX_RECORD_LEN != 0 {
        return Err(format!("Corrupt index of {} bytes", index.len()));
    }

    Ok(index[SHX_HEADER_LEN..]
        .chunks_exact(SHX_RECORD_LEN)
        .filter(|record| {
            let words = u32::from_be_bytes([record[4], record[5], record[6], record[7]]);
            words != NULL_SHAPE_WORDS
        })
        .count())
}

/// Parse EPSG code from WKT string.
///
/// The last `AUTHORITY["EPSG", ...]` belongs to the outermost CRS definition.
fn parse_epsg_from_wkt(wkt: &str) -> Option<u32> {
    const AUTHORITY: &str = "AUTHORITY[\"EPSG\",\"";
    if let Some(start) = wkt.rfind(AUTHORITY) {
        let code_start = start + AUTHORITY.len();
        if let Some(end) = wkt[code_start..].find('"') {
            if let Ok(code) = wkt[code_start..code_start + end].parse::<u32>() {
                return Some(code);
            }
        }
    }

    if let Some(start) = wkt.find("EPSG:") {
        let code: String =
            wkt[start + 5..].chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(code) = code.parse::<u32>() {
            return Some(code);
        }
    }

    None
}

fn kind_of_shape_type(shape_type: ShapeType) -> GeometryKind {
    match shape_type {
        ShapeType::Point | ShapeType::PointM | ShapeType::PointZ => GeometryKind::Point,
        ShapeType::Multipoint | ShapeType::MultipointM | ShapeType::MultipointZ => {
            GeometryKind::MultiPoint
        }
        ShapeType::Polyline | ShapeType::PolylineM | ShapeType::PolylineZ => {
            GeometryKind::LineString
        }
        ShapeType::Polygon | ShapeType::PolygonM | ShapeType::PolygonZ => GeometryKind::Polygon,
        _ => GeometryKind::Unknown,
    }
}

/// Convert a shape to a GeoJSON geometry; `None` for null and multipatch shapes
fn convert_shape(shape: &Shape, force_2d: bool) -> Option<Geometry> {
    let xy = |x: f64, y: f64| vec![x, y];
    let xyz = |x: f64, y: f64, z: f64| if force_2d { vec![x, y] } else { vec![x, y, z] };

    let value = match shape {
        Shape::Point(p) => Value::Point(xy(p.x, p.y)),
        Shape::PointM(p) => Value::Point(xy(p.x, p.y)),
        Shape::PointZ(p) => Value::Point(xyz(p.x, p.y, p.z)),
        Shape::Multipoint(mp) => Value::MultiPoint(mp.points().iter().map(|p| xy(p.x, p.y)).collect()),
        Shape::MultipointM(mp) => {
            Value::MultiPoint(mp.points().iter().map(|p| xy(p.x, p.y)).collect())
        }
        Shape::MultipointZ(mp) => {
            Value::MultiPoint(mp.points().iter().map(|p| xyz(p.x, p.y, p.z)).collect())
        }
        Shape::Polyline(line) => lines_value(line.parts(), |p| xy(p.x, p.y)),
        Shape::PolylineM(line) => lines_value(line.parts(), |p| xy(p.x, p.y)),
        Shape::PolylineZ(line) => lines_value(line.parts(), |p| xyz(p.x, p.y, p.z)),
        Shape::Polygon(polygon) => polygon_value(polygon.rings(), |p| xy(p.x, p.y)),
        Shape::PolygonM(polygon) => polygon_value(polygon.rings(), |p| xy(p.x, p.y)),
        Shape::PolygonZ(polygon) => polygon_value(polygon.rings(), |p| xyz(p.x, p.y, p.z)),
        Shape::Multipatch(_) | Shape::NullShape => return None,
    };

    Some(Geometry::new(value))
}

fn lines_value<P>(parts: &[Vec<P>], position: impl Fn(&P) -> Vec<f64>) -> Value {
    let mut lines: Vec<Vec<Vec<f64>>> =
        parts.iter().map(|part| part.iter().map(&position).collect()).collect();

    if lines.len() == 1 {
        Value::LineString(lines.remove(0))
    } else {
        Value::MultiLineString(lines)
    }
}

/// Group rings into polygons: an outer ring opens a polygon, inner rings
/// attach to the most recent one.
fn polygon_value<P>(rings: &[PolygonRing<P>], position: impl Fn(&P) -> Vec<f64>) -> Value {
    let mut polygons: Vec<Vec<Vec<Vec<f64>>>> = Vec::new();

    for ring in rings {
        let coords: Vec<Vec<f64>> = ring.points().iter().map(&position).collect();
        match polygons.last_mut() {
            Some(current) if matches!(ring, PolygonRing::Inner(_)) => current.push(coords),
            _ => polygons.push(vec![coords]),
        }
    }

    if polygons.len() == 1 {
        Value::Polygon(polygons.remove(0))
    } else {
        Value::MultiPolygon(polygons)
    }
}

/// Extract attributes from a DBF record
fn extract_attributes(record: Record) -> Attributes {
    record
        .into_iter()
        .map(|(name, value)| (name, convert_dbase_value(value)))
        .collect()
}

/// Convert dBase field value to an attribute value
fn convert_dbase_value(value: FieldValue) -> AttributeValue {
    match value {
        FieldValue::Character(Some(s)) => AttributeValue::Text(s.trim_end().to_string()),
        FieldValue::Numeric(Some(n)) => number(n),
        FieldValue::Logical(Some(b)) => AttributeValue::Bool(b),
        FieldValue::Date(Some(date)) => AttributeValue::Text(format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            date.month(),
            date.day()
        )),
        FieldValue::Float(Some(f)) => number(f as f64),
        FieldValue::Integer(i) => AttributeValue::Integer(i as i64),
        FieldValue::Currency(c) => AttributeValue::Number(c),
        FieldValue::DateTime(dt) => AttributeValue::Text(format!(
            "{:04}-{:02}-{:02}",
            dt.date().year(),
            dt.date().month(),
            dt.date().day()
        )),
        FieldValue::Double(d) => AttributeValue::Number(d),
        FieldValue::Memo(s) => AttributeValue::Text(s),
        FieldValue::Character(None)
        | FieldValue::Numeric(None)
        | FieldValue::Logical(None)
        | FieldValue::Date(None)
        | FieldValue::Float(None) => AttributeValue::Null,
    }
}

/// dBase stores integers in numeric fields; keep whole numbers integral
fn number(n: f64) -> AttributeValue {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        AttributeValue::Integer(n as i64)
    } else {
        AttributeValue::Number(n)
    }
}
