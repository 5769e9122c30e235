//! Douglas-Peucker simplification of normalized tables
//!
//! Simplification always builds a new table. A feature whose geometry
//! collapses at the requested tolerance keeps its full-resolution geometry.

use geo::{LineString, MultiPolygon, Polygon, Simplify};
use habmap_core::models::{NormalizedGeometryTable, TableFeature};

/// Result of simplifying a table
#[derive(Debug, Clone)]
pub struct SimplifiedTable {
    pub table: NormalizedGeometryTable,
    /// Features that kept their original geometry
    pub fallbacks: usize,
}

/// Simplify every feature of `table` at `tolerance` degrees
pub fn simplify_table(table: &NormalizedGeometryTable, tolerance: f64) -> SimplifiedTable {
    let mut fallbacks = 0;

    let features = table
        .features()
        .iter()
        .enumerate()
        .map(|(index, feature)| {
            let geometry = match simplify_geometry(&feature.geometry, tolerance) {
                Ok(simplified) => simplified,
                Err(reason) => {
                    tracing::warn!(
                        feature = index,
                        tolerance,
                        "Simplification failed ({}), keeping full-resolution geometry",
                        reason
                    );
                    fallbacks += 1;
                    feature.geometry.clone()
                }
            };
            TableFeature { geometry, attributes: feature.attributes.clone() }
        })
        .collect();

    SimplifiedTable { table: NormalizedGeometryTable::new(features), fallbacks }
}

/// Simplify a single geometry.
///
/// Holes and multipolygon members that collapse are dropped; an error is
/// returned when nothing drawable is left.
pub fn simplify_geometry(
    geometry: &geo::Geometry<f64>,
    tolerance: f64,
) -> Result<geo::Geometry<f64>, String> {
    if !tolerance.is_finite() || tolerance <= 0.0 {
        return Err(format!("invalid tolerance {}", tolerance));
    }

    let simplified = match geometry {
        geo::Geometry::LineString(ls) => geo::Geometry::LineString(simplify_line(ls, tolerance)?),
        geo::Geometry::MultiLineString(mls) => {
            geo::Geometry::MultiLineString(geo::MultiLineString(
                mls.0
                    .iter()
                    .map(|ls| simplify_line(ls, tolerance))
                    .collect::<Result<_, _>>()?,
            ))
        }
        geo::Geometry::Polygon(poly) => geo::Geometry::Polygon(
            simplify_polygon(poly, tolerance).ok_or_else(|| "exterior ring collapsed".to_string())?,
        ),
        geo::Geometry::MultiPolygon(mp) => {
            let polygons: Vec<Polygon<f64>> =
                mp.0.iter().filter_map(|poly| simplify_polygon(poly, tolerance)).collect();
            if polygons.is_empty() {
                return Err("every polygon collapsed".to_string());
            }
            geo::Geometry::MultiPolygon(MultiPolygon(polygons))
        }
        geo::Geometry::GeometryCollection(gc) => {
            geo::Geometry::GeometryCollection(geo::GeometryCollection(
                gc.0.iter()
                    .map(|member| simplify_geometry(member, tolerance))
                    .collect::<Result<_, _>>()?,
            ))
        }
        other => other.clone(),
    };

    Ok(simplified)
}

fn simplify_line(line: &LineString<f64>, tolerance: f64) -> Result<LineString<f64>, String> {
    let simplified = line.simplify(&tolerance);
    if simplified.0.len() < 2 {
        return Err("line collapsed".to_string());
    }
    Ok(simplified)
}

/// `None` when the exterior ring no longer encloses anything
fn simplify_polygon(polygon: &Polygon<f64>, tolerance: f64) -> Option<Polygon<f64>> {
    let exterior = polygon.exterior().simplify(&tolerance);
    if !is_ring(&exterior) {
        return None;
    }

    let interiors = polygon
        .interiors()
        .iter()
        .map(|ring| ring.simplify(&tolerance))
        .filter(is_ring)
        .collect();

    Some(Polygon::new(exterior, interiors))
}

fn is_ring(ring: &LineString<f64>) -> bool {
    ring.0.len() >= 4 && ring.is_closed()
}
