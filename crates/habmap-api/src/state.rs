use std::sync::Arc;

use habmap_core::config::LayeredConfig;
use habmap_layers::VectorLayerService;

use crate::error::ApiError;

/// Whether the optional vector subsystem came up
#[derive(Clone)]
pub enum VectorSupport {
    Ready(Arc<VectorLayerService>),
    Disabled { reason: String },
}

#[derive(Clone)]
pub struct AppState {
    pub vector: VectorSupport,
}

impl AppState {
    pub fn new(vector: VectorSupport) -> Self {
        Self { vector }
    }

    /// Build the vector service; failures leave the server up with vector
    /// routes answering 503
    pub fn initialize(config: &LayeredConfig) -> Self {
        let vector = match VectorLayerService::initialize(config) {
            Ok(service) => VectorSupport::Ready(Arc::new(service)),
            Err(e) => {
                tracing::warn!(error = %e, "Vector layers unavailable");
                VectorSupport::Disabled { reason: e.to_string() }
            }
        };
        Self { vector }
    }

    pub fn vector_service(&self) -> Result<Arc<VectorLayerService>, ApiError> {
        match &self.vector {
            VectorSupport::Ready(service) => Ok(Arc::clone(service)),
            VectorSupport::Disabled { reason } => {
                Err(ApiError::service_unavailable("Vector layer service not available")
                    .with_details(reason.clone()))
            }
        }
    }
}
