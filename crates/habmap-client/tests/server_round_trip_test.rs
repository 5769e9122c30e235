//! Zoom controller against a live habmap-api server

use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use habmap_api::{create_router, AppState};
use habmap_client::{HttpLayerFetcher, LayerDocument, MapView, ZoomController};
use habmap_core::config::{CliConfigOverrides, LayeredConfig, ZoomSettings};
use habmap_core::models::{Bounds, Tier};
use tempfile::TempDir;

const MUDFLATS: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature", "properties": {"zone": "inner"},
         "geometry": {"type": "Polygon", "coordinates": [[[-1.0,53.0],[-0.9,53.0],[-0.9,53.1],[-1.0,53.1],[-1.0,53.0]]]}},
        {"type": "Feature", "properties": {"zone": "outer"},
         "geometry": {"type": "Polygon", "coordinates": [[[-0.9,53.0],[-0.8,53.0],[-0.8,53.1],[-0.9,53.1],[-0.9,53.0]]]}}
    ]
}"#;

#[derive(Clone, Default)]
struct RecordingView {
    renders: Arc<Mutex<Vec<LayerDocument>>>,
    errors: Arc<Mutex<Vec<String>>>,
}

impl RecordingView {
    fn renders(&self) -> Vec<LayerDocument> {
        self.renders.lock().unwrap().clone()
    }

    async fn wait_for_renders(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while self.renders.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("timed out waiting for render");
    }
}

impl MapView for RecordingView {
    fn render(&mut self, document: &LayerDocument) {
        self.renders.lock().unwrap().push(document.clone());
    }

    fn show_error(&mut self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn clear_error(&mut self) {}

    fn set_view(&mut self, _bounds: Bounds, _zoom: f64) {}
}

async fn spawn_server(data_dir: &TempDir) -> String {
    let mut config = LayeredConfig::with_defaults();
    config.update_from_cli(CliConfigOverrides {
        data_dir: Some(data_dir.path().to_path_buf()),
        ..Default::default()
    });
    let app = create_router(Arc::new(AppState::initialize(&config)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", address)
}

fn fetcher(base_url: String) -> HttpLayerFetcher {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    HttpLayerFetcher::with_client(client, base_url)
}

fn tolerance(document: &LayerDocument) -> serde_json::Value {
    document.collection.foreign_members.as_ref().unwrap()["metadata"]["tolerance"].clone()
}

#[tokio::test]
async fn test_tiers_follow_zoom_across_the_wire() {
    let data_dir = TempDir::new().unwrap();
    fs::write(data_dir.path().join("mudflats.geojson"), MUDFLATS).unwrap();
    let base_url = spawn_server(&data_dir).await;

    let settings = ZoomSettings {
        threshold: 12.0,
        debounce: Duration::from_millis(20),
        settle: Duration::from_millis(50),
        ..Default::default()
    };
    let view = RecordingView::default();
    let (controller, handle) = ZoomController::new(fetcher(base_url), view.clone(), settings, 9.0);
    tokio::spawn(controller.run());

    handle.select_layer("mudflats.geojson/mudflats").await.unwrap();
    view.wait_for_renders(1).await;

    handle.zoom_changed(13.0).await.unwrap();
    view.wait_for_renders(2).await;

    let renders = view.renders();
    assert_eq!(renders[0].tier, Tier::Simplified);
    assert_eq!(tolerance(&renders[0]), 0.001);
    assert_eq!(renders[1].tier, Tier::Full);
    assert!(tolerance(&renders[1]).is_null());

    for document in &renders {
        assert_eq!(document.feature_count(), 2);
        let bounds = document.bounds().unwrap();
        assert!(bounds.approx_eq(&Bounds::new(-1.0, 53.0, -0.8, 53.1), 1e-9));
    }
    assert!(view.errors.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_layer_surfaces_error() {
    let data_dir = TempDir::new().unwrap();
    fs::write(data_dir.path().join("mudflats.geojson"), MUDFLATS).unwrap();
    let base_url = spawn_server(&data_dir).await;

    let view = RecordingView::default();
    let (controller, handle) =
        ZoomController::new(fetcher(base_url), view.clone(), ZoomSettings::default(), 9.0);
    tokio::spawn(controller.run());

    handle.select_layer("saltmarsh.geojson/saltmarsh").await.unwrap();

    tokio::time::timeout(Duration::from_secs(10), async {
        while view.errors.lock().unwrap().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for error");

    let errors = view.errors.lock().unwrap().clone();
    assert!(errors[0].starts_with("Layer fetch failed: Layer not found"), "{}", errors[0]);
    assert!(view.renders().is_empty());
}
