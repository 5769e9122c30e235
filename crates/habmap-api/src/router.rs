use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers;
use crate::state::AppState;

/// Create the API router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health_check))

        // Vector layers
        .route("/api/vector/layers", get(handlers::list_layers))
        .route("/api/vector/layer/{*id}", get(handlers::get_layer))
        .route("/api/vector/bounds", get(handlers::layer_bounds))

        .with_state(state)
}
