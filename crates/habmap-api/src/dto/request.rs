use serde::Deserialize;

/// Query string of a layer document request
#[derive(Debug, Default, Deserialize)]
pub struct LayerQuery {
    /// Simplification tolerance in degrees; absent or non-positive means full resolution
    pub simplify: Option<f64>,
}
