//! CRS transformation to the canonical display projection
//!
//! Reprojection uses pure-Rust PROJ.4 definitions for the EPSG codes the
//! datasets are known to use. Geographic definitions take and return
//! radians, so degrees are converted on both sides.

use geo::{Coord, MapCoords};
use habmap_core::models::Crs;
use habmap_core::{HabmapError, Result};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

/// Check if two CRS are the same
pub fn crs_match(crs1: &Crs, crs2: &Crs) -> bool {
    crs1.epsg == crs2.epsg
}

/// PROJ.4 definition for an EPSG code, if known
pub fn proj_string(epsg: u32) -> Option<String> {
    let definition = match epsg {
        4326 => "+proj=longlat +datum=WGS84 +no_defs".to_string(),
        4258 => "+proj=longlat +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +no_defs".to_string(),
        4269 => "+proj=longlat +datum=NAD83 +no_defs".to_string(),
        3857 | 900913 => {
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs"
                .to_string()
        }
        3035 => "+proj=laea +lat_0=52 +lon_0=10 +x_0=4321000 +y_0=3210000 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs".to_string(),
        27700 => "+proj=tmerc +lat_0=49 +lon_0=-2 +k=0.9996012717 +x_0=400000 +y_0=-100000 +ellps=airy +towgs84=446.448,-125.157,542.06,0.15,0.247,0.842,-20.489 +units=m +no_defs".to_string(),
        32601..=32660 => {
            format!("+proj=utm +zone={} +datum=WGS84 +units=m +no_defs", epsg - 32600)
        }
        32701..=32760 => {
            format!("+proj=utm +zone={} +south +datum=WGS84 +units=m +no_defs", epsg - 32700)
        }
        25828..=25838 => format!(
            "+proj=utm +zone={} +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
            epsg - 25800
        ),
        _ => return None,
    };
    Some(definition)
}

fn build(crs: &Crs) -> Result<(Proj, bool)> {
    let definition =
        proj_string(crs.epsg).ok_or_else(|| HabmapError::UnsupportedCrs { crs: crs.to_string() })?;
    let proj = Proj::from_proj_string(&definition).map_err(|e| HabmapError::UnsupportedCrs {
        crs: format!("{} ({})", crs, e),
    })?;
    Ok((proj, definition.starts_with("+proj=longlat")))
}

const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

fn is_web_mercator(crs: &Crs) -> bool {
    matches!(crs.epsg, 3857 | 900913)
}

enum Backend {
    /// Web Mercator coordinates are WGS 84 lon/lat projected on a sphere, so
    /// they are converted in closed form without an ellipsoid change.
    MercatorInverse,
    MercatorForward,
    Proj4 { from: Proj, to: Proj, from_geographic: bool, to_geographic: bool },
}

/// Reprojects coordinates between two coordinate systems
pub struct Reprojector {
    backend: Backend,
    label: String,
}

impl Reprojector {
    pub fn new(from: &Crs, to: &Crs) -> Result<Self> {
        let backend = match (is_web_mercator(from), is_web_mercator(to)) {
            (true, false) if to.is_wgs84() => Backend::MercatorInverse,
            (false, true) if from.is_wgs84() => Backend::MercatorForward,
            _ => {
                let (from_proj, from_geographic) = build(from)?;
                let (to_proj, to_geographic) = build(to)?;
                Backend::Proj4 { from: from_proj, to: to_proj, from_geographic, to_geographic }
            }
        };

        Ok(Self { backend, label: format!("{} -> {}", from, to) })
    }

    /// Reprojector into WGS 84 geographic degrees
    pub fn to_wgs84(from: &Crs) -> Result<Self> {
        Self::new(from, &Crs::wgs84())
    }

    /// Transform a single coordinate
    pub fn transform_coord(&self, coord: Coord<f64>) -> std::result::Result<Coord<f64>, String> {
        let (x, y) = match &self.backend {
            Backend::MercatorInverse => (
                (coord.x / WEB_MERCATOR_RADIUS).to_degrees(),
                (coord.y / WEB_MERCATOR_RADIUS).sinh().atan().to_degrees(),
            ),
            Backend::MercatorForward => (
                coord.x.to_radians() * WEB_MERCATOR_RADIUS,
                coord.y.to_radians().tan().asinh() * WEB_MERCATOR_RADIUS,
            ),
            Backend::Proj4 { from, to, from_geographic, to_geographic } => {
                let mut point = if *from_geographic {
                    (coord.x.to_radians(), coord.y.to_radians(), 0.0)
                } else {
                    (coord.x, coord.y, 0.0)
                };

                transform(from, to, &mut point).map_err(|e| {
                    format!("{} failed at ({}, {}): {}", self.label, coord.x, coord.y, e)
                })?;

                if *to_geographic {
                    (point.0.to_degrees(), point.1.to_degrees())
                } else {
                    (point.0, point.1)
                }
            }
        };

        if x.is_finite() && y.is_finite() {
            Ok(Coord { x, y })
        } else {
            Err(format!("{} produced a non-finite coordinate for ({}, {})", self.label, coord.x, coord.y))
        }
    }

    /// Reproject every coordinate of a geometry
    pub fn reproject(&self, geometry: &geo::Geometry<f64>) -> std::result::Result<geo::Geometry<f64>, String> {
        geometry.try_map_coords(|coord| self.transform_coord(coord))
    }
}
