//! Configuration loading utilities for CLI commands

use anyhow::{Context, Result};
use habmap_core::config::{CliConfigOverrides, LayeredConfig};
use std::path::Path;

/// Defaults, then the optional TOML file, then `HABMAP_*` variables, then flags
pub fn load_config(config_path: Option<&Path>, overrides: CliConfigOverrides) -> Result<LayeredConfig> {
    let mut config = LayeredConfig::with_defaults();
    if let Some(path) = config_path {
        config = config.load_from_file(path).context("Failed to load configuration file")?;
    }

    let mut config = config.load_from_env();
    config.update_from_cli(overrides);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}
