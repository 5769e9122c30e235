use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use habmap_layers::BoundsSummary;

use crate::dto::{DocumentResponse, LayerListResponse, LayerQuery};
use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_layers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LayerListResponse>, ApiError> {
    let service = state.vector_service()?;
    let layers = service.list_layers().to_vec();

    tracing::debug!(count = layers.len(), "Listing vector layers");
    Ok(Json(LayerListResponse { count: layers.len(), layers }))
}

pub async fn get_layer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: Result<Query<LayerQuery>, QueryRejection>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let Query(query) =
        query.map_err(|e| ApiError::bad_request("Invalid query parameters").with_details(e.body_text()))?;
    let service = state.vector_service()?;

    // Normalization and simplification are CPU-bound
    let document = tokio::task::spawn_blocking(move || service.get_layer_document(&id, query.simplify))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Layer document task failed");
            ApiError::internal("Failed to build layer document").with_details(e.to_string())
        })??;

    Ok(Json(DocumentResponse(document)))
}

pub async fn layer_bounds(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BoundsSummary>, ApiError> {
    let service = state.vector_service()?;
    Ok(Json(service.bounds_summary()))
}
