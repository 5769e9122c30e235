//! Export command implementation

use crate::cli::ExportArgs;
use crate::config_loader::load_config;
use crate::output::OutputWriter;
use crate::output_types::ExportOutput;
use anyhow::{Context, Result};
use habmap_core::config::CliConfigOverrides;
use habmap_layers::VectorLayerService;
use std::fs;
use std::path::Path;

pub fn execute(args: ExportArgs, config_path: Option<&Path>, output: &OutputWriter) -> Result<()> {
    let config = load_config(
        config_path,
        CliConfigOverrides { data_dir: args.data_dir, ..Default::default() },
    )?;

    let service = VectorLayerService::initialize(&config)?;
    let document = service
        .get_layer_document(&args.layer, args.tolerance)
        .with_context(|| format!("Failed to export layer '{}'", args.layer))?;

    if document.fallbacks > 0 {
        output.warning(format!(
            "{} feature(s) could not be simplified and were kept at full resolution",
            document.fallbacks
        ));
    }

    let text = document.to_json_string()?;
    tracing::debug!(layer = %document.layer, bytes = text.len(), "Serialized layer document");

    // Without --output the document itself is the only thing on stdout
    let Some(path) = args.output else {
        println!("{}", text);
        return Ok(());
    };

    fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;

    if output.is_json() {
        output.result(ExportOutput {
            layer: document.layer.to_string(),
            features: document.feature_count(),
            tolerance: document.tolerance(),
            fallbacks: document.fallbacks,
            output: Some(path),
        })
    } else {
        let resolution = match document.tolerance() {
            Some(tolerance) => format!("tolerance {}", tolerance),
            None => "full resolution".to_string(),
        };
        output.success(format!(
            "Exported {} ({} features, {}) to {}",
            document.metadata.display_name,
            document.feature_count(),
            resolution,
            path.display()
        ));
        Ok(())
    }
}
