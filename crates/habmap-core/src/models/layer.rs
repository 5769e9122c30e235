//! Layer identity and scan-time metadata.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::style::LayerStyle;

/// Stable identifier of a scanned layer: `"<source_file>/<layer_name>"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    pub fn new(source_file: &str, layer_name: &str) -> Self {
        Self(format!("{}/{}", source_file, layer_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Coordinate Reference System identified by EPSG code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crs {
    pub epsg: u32,
    pub name: String,
}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl Crs {
    pub fn new(epsg: u32, name: impl Into<String>) -> Self {
        Self { epsg, name: name.into() }
    }

    /// Build from a bare EPSG code, naming the codes we know
    pub fn from_epsg(epsg: u32) -> Self {
        match epsg {
            4326 => Self::wgs84(),
            3857 => Self::web_mercator(),
            4258 => Self::new(4258, "ETRS89"),
            3035 => Self::new(3035, "ETRS89 / LAEA Europe"),
            other => Self::new(other, format!("EPSG:{}", other)),
        }
    }

    /// WGS 84 (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::new(4326, "WGS 84")
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::new(3857, "Web Mercator")
    }

    pub fn is_wgs84(&self) -> bool {
        self.epsg == 4326
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

/// Bounding box in canonical geographic degrees.
///
/// Serialized as `[minLon, minLat, maxLon, maxLat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 4]", from = "[f64; 4]")]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bounds {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self { min_lon, min_lat, max_lon, max_lat }
    }

    pub fn from_rect(rect: geo::Rect<f64>) -> Self {
        let (min, max) = (rect.min(), rect.max());
        Self::new(min.x, min.y, max.x, max.y)
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    /// Smallest box covering both
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds::new(
            self.min_lon.min(other.min_lon),
            self.min_lat.min(other.min_lat),
            self.max_lon.max(other.max_lon),
            self.max_lat.max(other.max_lat),
        )
    }

    /// `[lon, lat]` midpoint
    pub fn center(&self) -> [f64; 2] {
        [(self.min_lon + self.max_lon) / 2.0, (self.min_lat + self.max_lat) / 2.0]
    }

    /// Component-wise comparison within `epsilon`
    pub fn approx_eq(&self, other: &Bounds, epsilon: f64) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }
}

impl From<Bounds> for [f64; 4] {
    fn from(b: Bounds) -> Self {
        b.to_array()
    }
}

impl From<[f64; 4]> for Bounds {
    fn from(a: [f64; 4]) -> Self {
        Bounds::new(a[0], a[1], a[2], a[3])
    }
}

/// Geometry type reported for a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
    GeometryCollection,
    Unknown,
}

/// Style family a geometry kind belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryFamily {
    Polygon,
    Line,
    Point,
}

impl GeometryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryKind::Point => "Point",
            GeometryKind::MultiPoint => "MultiPoint",
            GeometryKind::LineString => "LineString",
            GeometryKind::MultiLineString => "MultiLineString",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::MultiPolygon => "MultiPolygon",
            GeometryKind::GeometryCollection => "GeometryCollection",
            GeometryKind::Unknown => "Unknown",
        }
    }

    /// Polygon is the fallback family for anything unrecognized
    pub fn family(&self) -> GeometryFamily {
        match self {
            GeometryKind::Point | GeometryKind::MultiPoint => GeometryFamily::Point,
            GeometryKind::LineString | GeometryKind::MultiLineString => GeometryFamily::Line,
            _ => GeometryFamily::Polygon,
        }
    }

    /// Kind describing a layer that mixes `self` and `other`
    pub fn merge(self, other: GeometryKind) -> GeometryKind {
        use GeometryKind::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Unknown, b) => b,
            (a, Unknown) => a,
            (Polygon, MultiPolygon) | (MultiPolygon, Polygon) => MultiPolygon,
            (LineString, MultiLineString) | (MultiLineString, LineString) => MultiLineString,
            (Point, MultiPoint) | (MultiPoint, Point) => MultiPoint,
            _ => GeometryCollection,
        }
    }

    pub fn of(geometry: &geo::Geometry<f64>) -> Self {
        match geometry {
            geo::Geometry::Point(_) => GeometryKind::Point,
            geo::Geometry::MultiPoint(_) => GeometryKind::MultiPoint,
            geo::Geometry::Line(_) | geo::Geometry::LineString(_) => GeometryKind::LineString,
            geo::Geometry::MultiLineString(_) => GeometryKind::MultiLineString,
            geo::Geometry::Polygon(_) | geo::Geometry::Rect(_) | geo::Geometry::Triangle(_) => {
                GeometryKind::Polygon
            }
            geo::Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
            geo::Geometry::GeometryCollection(_) => GeometryKind::GeometryCollection,
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata for one (file, layer) pair, discovered once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    /// Unique identifier
    pub id: LayerId,

    /// Absolute path of the source file; never leaves the server
    #[serde(skip)]
    pub file_path: PathBuf,

    /// Layer name inside the source file
    pub layer_name: String,

    /// Human-readable name
    pub display_name: String,

    /// Geometry type
    pub geometry_type: GeometryKind,

    /// Number of features
    pub feature_count: usize,

    /// Extent in canonical geographic degrees
    pub bounds: Bounds,

    /// Coordinate system of the source file
    pub crs: Crs,

    /// Source file name
    pub source_file: String,

    /// Layer category
    pub category: String,

    /// Default display style
    pub style: LayerStyle,
}

impl LayerDescriptor {
    /// Key used by the server caches: the source path plus the layer name
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.file_path.display(), self.layer_name)
    }
}

/// Human-readable name for a layer.
///
/// Underscores become spaces and words are title-cased. When the layer is
/// named after its file only the file part is kept, otherwise the result is
/// `"<File> - <Layer>"`.
pub fn display_name(file_stem: &str, layer_name: &str) -> String {
    let file_part = title_case(file_stem);
    if layer_name.eq_ignore_ascii_case(file_stem) {
        return file_part;
    }
    format!("{} - {}", file_part, title_case(layer_name))
}

fn title_case(s: &str) -> String {
    s.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
