use serde::{Deserialize, Serialize};

use super::layer::{GeometryFamily, GeometryKind};

/// Display style attached to layers and documents (Leaflet path options)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerStyle {
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fill_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fill_opacity: Option<f64>,
    pub opacity: f64,
}

impl LayerStyle {
    pub fn polygon() -> Self {
        Self {
            color: "#008B8B".to_string(),
            fill_color: Some("#20B2AA".to_string()),
            weight: Some(2.0),
            radius: None,
            fill_opacity: Some(0.4),
            opacity: 0.8,
        }
    }

    pub fn line() -> Self {
        Self {
            color: "#40E0D0".to_string(),
            fill_color: None,
            weight: Some(3.0),
            radius: None,
            fill_opacity: None,
            opacity: 0.8,
        }
    }

    pub fn point() -> Self {
        Self {
            color: "#48D1CC".to_string(),
            fill_color: Some("#20B2AA".to_string()),
            weight: None,
            radius: Some(6.0),
            fill_opacity: Some(0.8),
            opacity: 1.0,
        }
    }

    /// Default style for a geometry type
    pub fn for_kind(kind: GeometryKind) -> Self {
        match kind.family() {
            GeometryFamily::Polygon => Self::polygon(),
            GeometryFamily::Line => Self::line(),
            GeometryFamily::Point => Self::point(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_per_family() {
        assert_eq!(LayerStyle::for_kind(GeometryKind::MultiPolygon), LayerStyle::polygon());
        assert_eq!(LayerStyle::for_kind(GeometryKind::LineString), LayerStyle::line());
        assert_eq!(LayerStyle::for_kind(GeometryKind::MultiPoint), LayerStyle::point());
    }

    #[test]
    fn test_style_json_shape() {
        let json = serde_json::to_value(LayerStyle::line()).unwrap();
        assert_eq!(json["color"], "#40E0D0");
        assert_eq!(json["weight"], 3.0);
        assert!(json.get("fillColor").is_none());

        let json = serde_json::to_value(LayerStyle::polygon()).unwrap();
        assert_eq!(json["fillColor"], "#20B2AA");
        assert_eq!(json["fillOpacity"], 0.4);
    }
}
