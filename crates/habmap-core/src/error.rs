//! Error types for habmap

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HabmapError {
    // Data errors
    #[error("Data unavailable at {path}: {reason}")]
    DataUnavailable { path: PathBuf, reason: String },

    #[error("Layer not found: {id}")]
    LayerNotFound { id: String },

    #[error("Vector service unavailable: {reason}")]
    ServiceUnavailable { reason: String },

    // Geometry errors
    #[error("Invalid geometry at feature {feature}: {reason}")]
    Geometry { feature: String, reason: String },

    // Format errors
    #[error("Unsupported format '.{extension}'. Supported: {}", supported.join(", "))]
    UnsupportedFormat { extension: String, supported: Vec<String> },

    #[error("Unsupported coordinate reference system: {crs}")]
    UnsupportedCrs { crs: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl HabmapError {
    /// Build a `DataUnavailable` error for a source file
    pub fn unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        HabmapError::DataUnavailable { path: path.into(), reason: reason.into() }
    }

    /// The caller addressed a layer that does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, HabmapError::LayerNotFound { .. })
    }

    /// The server cannot currently produce the data (as opposed to a bad request)
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            HabmapError::ServiceUnavailable { .. } | HabmapError::DataUnavailable { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, HabmapError>;
