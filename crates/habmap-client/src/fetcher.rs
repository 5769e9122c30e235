//! Layer document retrieval

use async_trait::async_trait;
use geojson::{FeatureCollection, GeoJson};
use habmap_core::models::{Bounds, Tier};

use crate::error::{ClientError, Result};

/// A layer document as held by the client
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDocument {
    pub layer: String,
    pub tier: Tier,
    pub collection: FeatureCollection,
}

impl LayerDocument {
    pub fn feature_count(&self) -> usize {
        self.collection.features.len()
    }

    /// `metadata.bounds` as reported by the server
    pub fn bounds(&self) -> Option<Bounds> {
        let bounds = self.collection.foreign_members.as_ref()?.get("metadata")?.get("bounds")?;
        serde_json::from_value(bounds.clone()).ok()
    }
}

/// Source of layer documents
#[async_trait]
pub trait LayerFetcher: Send + Sync {
    /// Fetch `layer` simplified at `tolerance` degrees, or at full resolution
    async fn fetch(&self, layer: &str, tolerance: Option<f64>) -> Result<FeatureCollection>;
}

#[async_trait]
impl<T: LayerFetcher + ?Sized> LayerFetcher for std::sync::Arc<T> {
    async fn fetch(&self, layer: &str, tolerance: Option<f64>) -> Result<FeatureCollection> {
        (**self).fetch(layer, tolerance).await
    }
}

/// Fetches documents from a habmap server
#[derive(Debug, Clone)]
pub struct HttpLayerFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLayerFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn layer_url(&self, layer: &str, tolerance: Option<f64>) -> String {
        let layer = layer.replace('%', "%25").replace('?', "%3F").replace('#', "%23");
        let mut url = format!("{}/api/vector/layer/{}", self.base_url, layer);
        if let Some(tolerance) = tolerance {
            url.push_str(&format!("?simplify={}", tolerance));
        }
        url
    }
}

#[async_trait]
impl LayerFetcher for HttpLayerFetcher {
    async fn fetch(&self, layer: &str, tolerance: Option<f64>) -> Result<FeatureCollection> {
        let url = self.layer_url(layer, tolerance);
        tracing::debug!(url = %url, "Fetching layer");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::fetch(Some(status.as_u16()), error_reason(status, &body)));
        }

        match body.parse::<GeoJson>() {
            Ok(GeoJson::FeatureCollection(collection)) => Ok(collection),
            Ok(_) => Err(ClientError::Decode("expected a FeatureCollection".to_string())),
            Err(e) => Err(ClientError::Decode(e.to_string())),
        }
    }
}

/// Reason from an `{"error", "details"}` body, or the status line
fn error_reason(status: reqwest::StatusCode, body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let field = |name: &str| {
        parsed.as_ref().and_then(|v| v.get(name)).and_then(|v| v.as_str()).map(str::to_string)
    };

    match (field("error"), field("details")) {
        (Some(error), Some(details)) => format!("{}: {}", error, details),
        (Some(error), None) => error,
        _ => status.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_url() {
        let fetcher = HttpLayerFetcher::new("http://localhost:5000/");

        assert_eq!(
            fetcher.layer_url("reefs.geojson/reefs", None),
            "http://localhost:5000/api/vector/layer/reefs.geojson/reefs"
        );
        assert_eq!(
            fetcher.layer_url("reefs.geojson/reefs", Some(0.001)),
            "http://localhost:5000/api/vector/layer/reefs.geojson/reefs?simplify=0.001"
        );
        assert_eq!(
            fetcher.layer_url("odd?name", None),
            "http://localhost:5000/api/vector/layer/odd%3Fname"
        );
    }

    #[test]
    fn test_error_reason_prefers_body() {
        let status = reqwest::StatusCode::SERVICE_UNAVAILABLE;

        assert_eq!(
            error_reason(status, r#"{"error": "Vector layer data unavailable", "details": "gone"}"#),
            "Vector layer data unavailable: gone"
        );
        assert_eq!(error_reason(status, r#"{"error": "Layer not found"}"#), "Layer not found");
        assert_eq!(error_reason(status, "<html>"), "503 Service Unavailable");
    }

    #[test]
    fn test_document_bounds_from_metadata() {
        let text = r#"{"type": "FeatureCollection", "features": [],
                       "metadata": {"bounds": [1.0, 2.0, 3.0, 4.0]}}"#;
        let GeoJson::FeatureCollection(collection) = text.parse::<GeoJson>().unwrap() else {
            panic!("expected collection");
        };
        let document = LayerDocument { layer: "reefs".into(), tier: Tier::Full, collection };

        assert_eq!(document.bounds(), Some(Bounds::new(1.0, 2.0, 3.0, 4.0)));
        assert_eq!(document.feature_count(), 0);
    }
}
