//! Conversion from decoded GeoJSON geometry to `geo` types
//!
//! Conversion is strict about dimensions: any position that does not have
//! exactly two ordinates is rejected, so elevation has to be stripped first
//! with [`force_2d`] when the reader does not guarantee 2D output.

use geo::{Coord, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use geojson::{PolygonType, Position, Value};

/// Whether any position of the geometry carries more than two ordinates
pub fn has_elevation(value: &Value) -> bool {
    match value {
        Value::Point(p) => p.len() > 2,
        Value::MultiPoint(points) | Value::LineString(points) => points.iter().any(|p| p.len() > 2),
        Value::MultiLineString(lines) | Value::Polygon(lines) => {
            lines.iter().flatten().any(|p| p.len() > 2)
        }
        Value::MultiPolygon(polygons) => polygons.iter().flatten().flatten().any(|p| p.len() > 2),
        Value::GeometryCollection(geometries) => {
            geometries.iter().any(|g| has_elevation(&g.value))
        }
    }
}

/// Drop every ordinate past the second
pub fn force_2d(value: &Value) -> Value {
    fn flat(p: &Position) -> Position {
        p.iter().take(2).copied().collect()
    }
    fn flat_all(points: &[Position]) -> Vec<Position> {
        points.iter().map(flat).collect()
    }
    fn flat_rings(rings: &[Vec<Position>]) -> Vec<Vec<Position>> {
        rings.iter().map(|r| flat_all(r)).collect()
    }

    match value {
        Value::Point(p) => Value::Point(flat(p)),
        Value::MultiPoint(points) => Value::MultiPoint(flat_all(points)),
        Value::LineString(points) => Value::LineString(flat_all(points)),
        Value::MultiLineString(lines) => Value::MultiLineString(flat_rings(lines)),
        Value::Polygon(rings) => Value::Polygon(flat_rings(rings)),
        Value::MultiPolygon(polygons) => {
            Value::MultiPolygon(polygons.iter().map(|p| flat_rings(p)).collect())
        }
        Value::GeometryCollection(geometries) => Value::GeometryCollection(
            geometries.iter().map(|g| geojson::Geometry::new(force_2d(&g.value))).collect(),
        ),
    }
}

/// Convert a GeoJSON value into a 2D `geo` geometry
pub fn to_planar(value: &Value) -> Result<geo::Geometry<f64>, String> {
    let geometry = match value {
        Value::Point(p) => geo::Geometry::Point(Point(coord(p)?)),
        Value::MultiPoint(points) => geo::Geometry::MultiPoint(MultiPoint(
            points.iter().map(|p| coord(p).map(Point)).collect::<Result<_, _>>()?,
        )),
        Value::LineString(points) => geo::Geometry::LineString(line_string(points)?),
        Value::MultiLineString(lines) => geo::Geometry::MultiLineString(MultiLineString(
            lines.iter().map(|l| line_string(l)).collect::<Result<_, _>>()?,
        )),
        Value::Polygon(rings) => geo::Geometry::Polygon(polygon(rings)?),
        Value::MultiPolygon(polygons) => geo::Geometry::MultiPolygon(MultiPolygon(
            polygons.iter().map(|p| polygon(p)).collect::<Result<_, _>>()?,
        )),
        Value::GeometryCollection(geometries) => {
            geo::Geometry::GeometryCollection(geo::GeometryCollection(
                geometries.iter().map(|g| to_planar(&g.value)).collect::<Result<_, _>>()?,
            ))
        }
    };
    Ok(geometry)
}

/// Convert a `geo` geometry back into a GeoJSON value
pub fn to_geojson(geometry: &geo::Geometry<f64>) -> Value {
    Value::from(geometry)
}

fn coord(position: &Position) -> Result<Coord<f64>, String> {
    match position.as_slice() {
        [x, y] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
        [_, _] => Err(format!("non-finite coordinate {:?}", position)),
        other => Err(format!("expected 2 ordinates, found {}", other.len())),
    }
}

fn line_string(points: &[Position]) -> Result<LineString<f64>, String> {
    Ok(LineString(points.iter().map(coord).collect::<Result<_, _>>()?))
}

fn polygon(rings: &PolygonType) -> Result<Polygon<f64>, String> {
    let mut rings = rings.iter().map(|r| line_string(r));
    let exterior = rings.next().ok_or_else(|| "polygon without rings".to_string())??;
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}
