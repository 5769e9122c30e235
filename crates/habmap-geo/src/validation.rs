use habmap_core::{HabmapError, Result};

/// Validation result with details
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Validation error with location details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub location: String,
    pub reason: String,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        Self { is_valid: true, errors: Vec::new() }
    }

    /// Add an error to the result
    pub fn add_error(&mut self, location: String, reason: String) {
        self.is_valid = false;
        self.errors.push(ValidationError { location, reason });
    }

    /// Fold a nested result in, prefixing its locations
    fn absorb(&mut self, prefix: String, nested: ValidationResult) {
        for error in nested.errors {
            self.add_error(format!("{}.{}", prefix, error.location), error.reason);
        }
    }

    /// Convert into a `Geometry` error for `feature`
    pub fn into_result(self, feature: &str) -> Result<()> {
        match self.errors.into_iter().next() {
            None => Ok(()),
            Some(error) => Err(HabmapError::Geometry {
                feature: feature.to_string(),
                reason: format!("{}: {}", error.location, error.reason),
            }),
        }
    }
}

/// Validate a geometry
pub fn validate_geometry(geometry: &geo::Geometry<f64>) -> ValidationResult {
    match geometry {
        geo::Geometry::Point(p) => validate_coords("Point", std::iter::once(p.0)),
        geo::Geometry::Line(l) => validate_coords("Line", [l.start, l.end].into_iter()),
        geo::Geometry::LineString(ls) => validate_linestring(ls),
        geo::Geometry::Polygon(poly) => validate_polygon(poly),
        geo::Geometry::MultiPoint(mp) => validate_coords("MultiPoint", mp.0.iter().map(|p| p.0)),
        geo::Geometry::MultiLineString(mls) => {
            let mut result = ValidationResult::valid();
            for (i, linestring) in mls.0.iter().enumerate() {
                result.absorb(format!("MultiLineString[{}]", i), validate_linestring(linestring));
            }
            result
        }
        geo::Geometry::MultiPolygon(mp) => validate_multipolygon(mp),
        geo::Geometry::GeometryCollection(gc) => {
            let mut result = ValidationResult::valid();
            for (i, member) in gc.0.iter().enumerate() {
                result.absorb(format!("GeometryCollection[{}]", i), validate_geometry(member));
            }
            result
        }
        geo::Geometry::Rect(r) => validate_coords("Rect", [r.min(), r.max()].into_iter()),
        geo::Geometry::Triangle(t) => validate_coords("Triangle", t.to_array().into_iter()),
    }
}

fn validate_coords(location: &str, coords: impl Iterator<Item = geo::Coord<f64>>) -> ValidationResult {
    let mut result = ValidationResult::valid();
    for (i, coord) in coords.enumerate() {
        if !coord.x.is_finite() || !coord.y.is_finite() {
            result.add_error(format!("{}[{}]", location, i), "Coordinates must be finite".to_string());
        }
    }
    result
}

fn validate_linestring(linestring: &geo::LineString<f64>) -> ValidationResult {
    // LineString must have at least 2 points
    if linestring.0.len() < 2 {
        let mut result = ValidationResult::valid();
        result.add_error(
            "LineString".to_string(),
            format!("LineString must have at least 2 points, found {}", linestring.0.len()),
        );
        return result;
    }

    validate_coords("LineString", linestring.0.iter().copied())
}

fn validate_ring(location: String, ring: &geo::LineString<f64>, result: &mut ValidationResult) {
    if ring.0.len() < 4 {
        result.add_error(
            location.clone(),
            format!("Ring must have at least 4 points, found {}", ring.0.len()),
        );
    }

    if let (Some(first), Some(last)) = (ring.0.first(), ring.0.last()) {
        if first != last {
            result.add_error(
                location.clone(),
                "Ring must be closed (first point == last point)".to_string(),
            );
        }
    }

    result.absorb(location, validate_coords("coords", ring.0.iter().copied()));
}

/// Validate a polygon's rings: closed, at least 4 points, finite coordinates
pub fn validate_polygon(polygon: &geo::Polygon<f64>) -> ValidationResult {
    let mut result = ValidationResult::valid();

    validate_ring("Polygon exterior".to_string(), polygon.exterior(), &mut result);
    for (i, interior) in polygon.interiors().iter().enumerate() {
        validate_ring(format!("Polygon interior[{}]", i), interior, &mut result);
    }

    result
}

fn validate_multipolygon(multipolygon: &geo::MultiPolygon<f64>) -> ValidationResult {
    let mut result = ValidationResult::valid();

    if multipolygon.0.is_empty() {
        result.add_error("MultiPolygon".to_string(), "MultiPolygon has no members".to_string());
    }

    for (i, polygon) in multipolygon.0.iter().enumerate() {
        result.absorb(format!("MultiPolygon[{}]", i), validate_polygon(polygon));
    }

    result
}

/// Count invalid geometries in a collection
pub fn count_invalid_geometries<'a>(geometries: impl IntoIterator<Item = &'a geo::Geometry<f64>>) -> usize {
    geometries.into_iter().filter(|g| !validate_geometry(g).is_valid).count()
}
