//! habmap Geo - Coordinate normalization, simplification, and area
//!
//! This crate turns decoded source layers into normalized geometry tables
//! (reprojected to WGS 84, two-dimensional) and provides the per-feature
//! geometry operations used when serving them.

pub mod area;
pub mod convert;
pub mod normalize;
pub mod simplify;
pub mod transform;
pub mod validation;

pub use area::geodesic_area_km2;
pub use normalize::GeometryNormalizer;
pub use simplify::{simplify_geometry, simplify_table, SimplifiedTable};
pub use transform::Reprojector;
