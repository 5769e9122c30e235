pub mod layer;
pub mod style;
pub mod table;
pub mod tier;

pub use layer::{display_name, Bounds, Crs, GeometryFamily, GeometryKind, LayerDescriptor, LayerId};
pub use style::LayerStyle;
pub use table::{AttributeValue, Attributes, NormalizedGeometryTable, TableFeature};
pub use tier::{Tier, ToleranceBucket};
