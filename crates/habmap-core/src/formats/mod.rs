//! Format abstraction layer for vector dataset files
//!
//! Each supported format implements the `FormatReader` trait, and the
//! `FormatRegistry` detects the format of a file and dispatches to the
//! appropriate reader. Readers expose a cheap header read for the startup
//! scan and a full read for the geometry normalizer.

use std::path::Path;

use crate::error::{HabmapError, Result};
use crate::models::{Attributes, Crs, GeometryKind};

pub mod geojson;
pub mod shapefile;
pub mod validation;

pub use self::geojson::GeoJsonReader;
pub use self::shapefile::ShapefileReader;
pub use validation::FormatValidator;

/// Format reader trait that all format implementations must implement
pub trait FormatReader: Send + Sync {
    /// Get supported file extensions (e.g., ["shp"])
    fn supported_extensions(&self) -> &[&str];

    /// Get human-readable format name (e.g., "Shapefile", "GeoJSON")
    fn format_name(&self) -> &str;

    /// Names of the layers contained in the file
    fn layer_names(&self, path: &Path) -> Result<Vec<String>>;

    /// Read layer metadata without materializing geometry where the format allows it
    fn layer_header(&self, path: &Path, layer: &str) -> Result<LayerHeader>;

    /// Read every feature of a layer
    fn read_layer(&self, path: &Path, layer: &str, options: ReadOptions) -> Result<SourceLayer>;

    /// Validate file structure without full read
    fn validate(&self, path: &Path) -> FormatValidation {
        FormatValidator::validate_file_exists(path)
    }
}

/// Result of format validation
#[derive(Debug, Clone, Default)]
pub struct FormatValidation {
    /// Validation errors that prevent reading
    pub errors: Vec<String>,

    /// Warnings that don't prevent reading but indicate potential issues
    pub warnings: Vec<String>,
}

impl FormatValidation {
    /// Check if validation passed (no errors)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Options for a full layer read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Ask the reader to drop elevation while decoding
    pub force_2d: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { force_2d: true }
    }
}

/// What a reader guarantees about coordinate dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimensions {
    /// Every position has exactly two ordinates
    Xy,
    /// Positions may carry elevation
    Unknown,
}

/// Metadata read at scan time
#[derive(Debug, Clone, PartialEq)]
pub struct LayerHeader {
    pub kind: GeometryKind,
    pub feature_count: usize,
    /// Extent in the source coordinate system
    pub extent: Option<geo::Rect<f64>>,
    pub crs: Crs,
}

/// Feature as decoded from a source file
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFeature {
    pub geometry: Option<::geojson::Geometry>,
    pub attributes: Attributes,
}

/// Layer as decoded from a source file, still in the source CRS
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLayer {
    pub name: String,
    pub crs: Crs,
    pub dimensions: Dimensions,
    pub features: Vec<SourceFeature>,
}

/// Central registry for format readers
///
/// The registry maintains a collection of format readers and provides
/// format detection based on file extensions.
pub struct FormatRegistry {
    readers: Vec<Box<dyn FormatReader>>,
}

impl FormatRegistry {
    /// Create a new empty format registry
    pub fn new() -> Self {
        Self { readers: Vec::new() }
    }

    /// Registry with every built-in reader
    pub fn with_default_readers() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(GeoJsonReader));
        registry.register(Box::new(ShapefileReader));
        registry
    }

    /// Register a format reader
    pub fn register(&mut self, reader: Box<dyn FormatReader>) {
        self.readers.push(reader);
    }

    /// Detect format and return appropriate reader
    pub fn detect_format(&self, path: &Path) -> Result<&dyn FormatReader> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();

        self.readers
            .iter()
            .find(|reader| {
                reader.supported_extensions().iter().any(|e| e.eq_ignore_ascii_case(&extension))
            })
            .map(|reader| reader.as_ref())
            .ok_or_else(|| HabmapError::UnsupportedFormat {
                extension,
                supported: self.supported_extensions(),
            })
    }

    /// Whether any registered reader handles this file
    pub fn is_supported(&self, path: &Path) -> bool {
        self.detect_format(path).is_ok()
    }

    /// Get all supported extensions
    pub fn supported_extensions(&self) -> Vec<String> {
        self.readers
            .iter()
            .flat_map(|reader| reader.supported_extensions().iter().map(|ext| ext.to_string()))
            .collect()
    }

    /// Get all registered format names
    pub fn format_names(&self) -> Vec<&str> {
        self.readers.iter().map(|reader| reader.format_name()).collect()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_default_readers()
    }
}

/// Parse an EPSG code out of a CRS name such as `EPSG:3857`,
/// `urn:ogc:def:crs:EPSG::3857`, or the OGC CRS84 URN.
pub fn parse_crs_name(name: &str) -> Option<u32> {
    let name = name.trim();
    if name.ends_with("CRS84") {
        return Some(4326);
    }

    name.rsplit(':')
        .find(|part| !part.is_empty())
        .and_then(|code| code.parse::<u32>().ok())
}

/// Layer name for single-layer formats: the file stem
pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("unnamed").to_string()
}
