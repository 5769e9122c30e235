use std::sync::Arc;

use axum::{extract::State, Json};

use crate::dto::{HealthResponse, VectorHealth};
use crate::state::{AppState, VectorSupport};

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let vector_layers = match &state.vector {
        VectorSupport::Ready(service) => {
            VectorHealth { available: true, reason: None, stats: Some(service.stats()) }
        }
        VectorSupport::Disabled { reason } => {
            VectorHealth { available: false, reason: Some(reason.clone()), stats: None }
        }
    };

    Json(HealthResponse { status: "healthy", version: env!("CARGO_PKG_VERSION"), vector_layers })
}
