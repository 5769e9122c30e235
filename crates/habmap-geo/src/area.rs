//! Geodesic area of polygon features

use geo::orient::{Direction, Orient};
use geo::GeodesicArea;

use crate::validation::validate_geometry;

const SQUARE_METERS_PER_KM2: f64 = 1_000_000.0;

/// Area on the WGS 84 ellipsoid in square kilometers.
///
/// Rings are reoriented first (exterior counter-clockwise, interiors
/// clockwise), so winding order in the source does not matter.
///
/// Returns `Ok(None)` for geometries that have no area (points, lines) and
/// an error for polygons that fail validation or produce a non-finite area.
pub fn geodesic_area_km2(geometry: &geo::Geometry<f64>) -> Result<Option<f64>, String> {
    let square_meters = match geometry {
        geo::Geometry::Polygon(poly) => {
            check_valid(geometry)?;
            poly.orient(Direction::Default).geodesic_area_unsigned()
        }
        geo::Geometry::MultiPolygon(mp) => {
            check_valid(geometry)?;
            mp.orient(Direction::Default).geodesic_area_unsigned()
        }
        _ => return Ok(None),
    };

    let km2 = square_meters / SQUARE_METERS_PER_KM2;
    if km2.is_finite() && km2 >= 0.0 {
        Ok(Some(km2))
    } else {
        Err(format!("geodesic area is not a finite value ({})", km2))
    }
}

fn check_valid(geometry: &geo::Geometry<f64>) -> Result<(), String> {
    match validate_geometry(geometry).errors.first() {
        Some(error) => Err(format!("{}: {}", error.location, error.reason)),
        None => Ok(()),
    }
}
