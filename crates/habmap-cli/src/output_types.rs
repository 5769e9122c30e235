//! Output structures for CLI commands

use habmap_core::models::{Bounds, LayerDescriptor};
use serde::Serialize;
use std::path::PathBuf;
use tabled::Tabled;

/// JSON output for `layers`
#[derive(Debug, Serialize)]
pub struct LayersOutput {
    pub data_dir: PathBuf,
    pub count: usize,
    pub layers: Vec<LayerDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_bounds: Option<Bounds>,
}

#[derive(Tabled)]
pub struct LayerRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Geometry")]
    pub geometry: String,
    #[tabled(rename = "Features")]
    pub features: usize,
    #[tabled(rename = "CRS")]
    pub crs: String,
    #[tabled(rename = "Bounds")]
    pub bounds: String,
}

impl From<&LayerDescriptor> for LayerRow {
    fn from(layer: &LayerDescriptor) -> Self {
        let [min_x, min_y, max_x, max_y] = layer.bounds.to_array();
        Self {
            id: layer.id.to_string(),
            name: layer.display_name.clone(),
            geometry: layer.geometry_type.to_string(),
            features: layer.feature_count,
            crs: layer.crs.to_string(),
            bounds: format!("{:.4}, {:.4}, {:.4}, {:.4}", min_x, min_y, max_x, max_y),
        }
    }
}

/// JSON output for `export`
#[derive(Debug, Serialize)]
pub struct ExportOutput {
    pub layer: String,
    pub features: usize,
    pub tolerance: Option<f64>,
    /// Features emitted at full resolution because simplification failed
    pub fallbacks: usize,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize, Tabled)]
pub struct ConfigRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}
