//! In-memory geometry tables.

use geo::BoundingRect;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::layer::{Bounds, GeometryKind};

/// Scalar attribute value carried by a feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl AttributeValue {
    /// Convert a JSON value. Nested arrays and objects are kept as their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => AttributeValue::Null,
            serde_json::Value::Bool(b) => AttributeValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => AttributeValue::Integer(i),
                None => n.as_f64().map(AttributeValue::Number).unwrap_or(AttributeValue::Null),
            },
            serde_json::Value::String(s) => AttributeValue::Text(s.clone()),
            other => AttributeValue::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttributeValue::Null => serde_json::Value::Null,
            AttributeValue::Bool(b) => serde_json::Value::Bool(*b),
            AttributeValue::Integer(i) => serde_json::Value::from(*i),
            AttributeValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            AttributeValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// Ordered attribute mapping
pub type Attributes = BTreeMap<String, AttributeValue>;

/// One feature of a normalized table
#[derive(Debug, Clone, PartialEq)]
pub struct TableFeature {
    /// Two-dimensional geometry in canonical geographic degrees
    pub geometry: geo::Geometry<f64>,
    pub attributes: Attributes,
}

/// A layer's full-resolution features after coordinate normalization.
///
/// Tables are shared read-only behind `Arc`; transformations build new tables.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedGeometryTable {
    features: Vec<TableFeature>,
    kind: GeometryKind,
    bounds: Option<Bounds>,
}

impl NormalizedGeometryTable {
    pub fn new(features: Vec<TableFeature>) -> Self {
        let kind = features
            .iter()
            .map(|f| GeometryKind::of(&f.geometry))
            .fold(GeometryKind::Unknown, GeometryKind::merge);

        let bounds = features
            .iter()
            .filter_map(|f| f.geometry.bounding_rect())
            .map(Bounds::from_rect)
            .reduce(|a, b| a.union(&b));

        Self { features, kind, bounds }
    }

    pub fn features(&self) -> &[TableFeature] {
        &self.features
    }

    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    /// Extent of all geometries; `None` for an empty table
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square(x: f64, y: f64, size: f64) -> geo::Geometry<f64> {
        geo::Geometry::Polygon(polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
            (x: x, y: y),
        ])
    }

    #[test]
    fn test_table_bounds_and_kind() {
        let table = NormalizedGeometryTable::new(vec![
            TableFeature { geometry: square(0.0, 0.0, 1.0), attributes: Attributes::new() },
            TableFeature { geometry: square(2.0, 3.0, 1.0), attributes: Attributes::new() },
        ]);

        assert_eq!(table.len(), 2);
        assert_eq!(table.kind(), GeometryKind::Polygon);
        assert_eq!(table.bounds(), Some(Bounds::new(0.0, 0.0, 3.0, 4.0)));
    }

    #[test]
    fn test_empty_table() {
        let table = NormalizedGeometryTable::new(Vec::new());
        assert!(table.is_empty());
        assert_eq!(table.bounds(), None);
        assert_eq!(table.kind(), GeometryKind::Unknown);
    }

    #[test]
    fn test_attribute_json_conversion() {
        let json = serde_json::json!({"n": 3, "f": 1.5, "s": "x", "b": true, "z": null, "a": [1, 2]});
        let attrs: Attributes = json
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), AttributeValue::from_json(v)))
            .collect();

        assert_eq!(attrs["n"], AttributeValue::Integer(3));
        assert_eq!(attrs["f"], AttributeValue::Number(1.5));
        assert_eq!(attrs["s"], AttributeValue::Text("x".to_string()));
        assert_eq!(attrs["b"], AttributeValue::Bool(true));
        assert_eq!(attrs["z"], AttributeValue::Null);
        assert_eq!(attrs["a"], AttributeValue::Text("[1,2]".to_string()));
        assert_eq!(AttributeValue::Number(f64::NAN).to_json(), serde_json::Value::Null);

        // Keys serialize in sorted order
        let keys: Vec<&String> = attrs.keys().collect();
        assert_eq!(keys, vec!["a", "b", "f", "n", "s", "z"]);
    }
}
