//! Zoom-adaptive layer client
//!
//! Keeps one vector layer on a map at the resolution tier that fits the
//! current zoom: simplified below the threshold, full at and above it.

pub mod cache;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod fetcher;
pub mod switcher;

pub use cache::ClientLayerCache;
pub use controller::{ControllerHandle, MapView, ZoomController};
pub use debounce::Debouncer;
pub use error::{ClientError, Result};
pub use fetcher::{HttpLayerFetcher, LayerDocument, LayerFetcher};
pub use switcher::{CacheProbe, Command, Event, Phase, ZoomSwitcher};
