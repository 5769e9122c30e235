use std::sync::Arc;

use habmap_core::models::LayerDescriptor;
use habmap_layers::{SerializedDocument, ServiceStats};
use serde::{Serialize, Serializer};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub vector_layers: VectorHealth,
}

/// Vector subsystem part of the health check
#[derive(Debug, Serialize)]
pub struct VectorHealth {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ServiceStats>,
}

/// Layer listing response
#[derive(Debug, Serialize)]
pub struct LayerListResponse {
    pub layers: Vec<LayerDescriptor>,
    pub count: usize,
}

/// Layer document shared with the document cache
#[derive(Debug)]
pub struct DocumentResponse(pub Arc<SerializedDocument>);

impl Serialize for DocumentResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}
