use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// habmap - Vector habitat layer tools
#[derive(Parser, Debug)]
#[command(name = "habmap")]
#[command(about = "Scan vector habitat layers and export them as GeoJSON", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the layers found in the dataset directory
    Layers(LayersArgs),

    /// Write one layer as a GeoJSON document
    Export(ExportArgs),

    /// Show the effective configuration and where each value came from
    Config,
}

#[derive(Parser, Debug)]
pub struct LayersArgs {
    /// Dataset directory (overrides configuration)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Layer id (`file/layer`) or display name
    pub layer: String,

    /// Simplification tolerance in degrees (full resolution when omitted)
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Output file (stdout when omitted)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Dataset directory (overrides configuration)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}
