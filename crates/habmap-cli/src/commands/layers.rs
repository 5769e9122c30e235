//! Layers command implementation

use crate::cli::LayersArgs;
use crate::config_loader::load_config;
use crate::output::OutputWriter;
use crate::output_types::{LayerRow, LayersOutput};
use anyhow::{bail, Result};
use habmap_core::config::CliConfigOverrides;
use habmap_geo::GeometryNormalizer;
use habmap_layers::DatasetScanner;
use std::path::Path;

pub fn execute(args: LayersArgs, config_path: Option<&Path>, output: &OutputWriter) -> Result<()> {
    let config = load_config(
        config_path,
        CliConfigOverrides { data_dir: args.data_dir, ..Default::default() },
    )?;
    let data_dir = config.data_dir.value;
    if !data_dir.is_dir() {
        bail!("Dataset directory not found: {}", data_dir.display());
    }

    let normalizer = GeometryNormalizer::default();
    let registry = DatasetScanner::new(&normalizer).scan(&data_dir);
    let summary = registry.bounds_summary();
    tracing::debug!(data_dir = %data_dir.display(), layers = registry.len(), "Scanned dataset directory");

    if output.is_json() {
        return output.result(LayersOutput {
            count: registry.len(),
            layers: registry.layers().to_vec(),
            overall_bounds: summary.overall_bounds,
            data_dir,
        });
    }

    if registry.is_empty() {
        output.info(format!("No vector layers found in {}", data_dir.display()));
        return Ok(());
    }

    output.section("Vector Layers");
    output.table(registry.layers().iter().map(LayerRow::from).collect());

    if let Some(bounds) = summary.overall_bounds {
        let [min_x, min_y, max_x, max_y] = bounds.to_array();
        output.kv("Layers", registry.len());
        output.kv("Overall bounds", format!("{:.4}, {:.4}, {:.4}, {:.4}", min_x, min_y, max_x, max_y));
    }
    Ok(())
}
