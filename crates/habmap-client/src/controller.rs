//! Zoom controller
//!
//! Runs the client event loop: map events and timer/fetch completions arrive
//! on one channel, go through the [`ZoomSwitcher`], and the resulting
//! commands are carried out here. The [`MapView`] is only touched from this
//! loop.

use std::sync::Arc;

use habmap_core::config::ZoomSettings;
use habmap_core::models::{Bounds, Tier};
use tokio::sync::mpsc;

use crate::cache::ClientLayerCache;
use crate::debounce::Debouncer;
use crate::error::{ClientError, Result};
use crate::fetcher::{LayerDocument, LayerFetcher};
use crate::switcher::{Command, Event, ZoomSwitcher};

const CHANNEL_CAPACITY: usize = 64;

/// Rendering surface driven by the controller
pub trait MapView: Send {
    fn render(&mut self, document: &LayerDocument);

    fn show_error(&mut self, message: &str);

    fn clear_error(&mut self);

    /// Programmatic pan and zoom
    fn set_view(&mut self, bounds: Bounds, zoom: f64);
}

#[derive(Debug)]
enum Input {
    Event(Event),
    Fetched { layer: String, tier: Tier, ticket: u64, result: Result<LayerDocument> },
    ZoomToArea { bounds: Bounds, zoom: f64 },
}

/// Cloneable sender side of a running [`ZoomController`]
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: mpsc::Sender<Input>,
}

impl ControllerHandle {
    /// Report the map's zoom level (e.g. from a `zoomend` callback)
    pub async fn zoom_changed(&self, zoom: f64) -> Result<()> {
        self.send(Input::Event(Event::ZoomChanged(zoom))).await
    }

    pub async fn select_layer(&self, layer: impl Into<String>) -> Result<()> {
        self.send(Input::Event(Event::LayerSelected(layer.into()))).await
    }

    /// Fly to `bounds` at `zoom`; automatic switching resumes once the view settles
    pub async fn zoom_to_area(&self, bounds: Bounds, zoom: f64) -> Result<()> {
        self.send(Input::ZoomToArea { bounds, zoom }).await
    }

    async fn send(&self, input: Input) -> Result<()> {
        self.tx.send(input).await.map_err(|_| ClientError::Closed)
    }
}

pub struct ZoomController<F, V> {
    switcher: ZoomSwitcher,
    cache: ClientLayerCache,
    debounce: Debouncer,
    settle: Debouncer,
    fetcher: Arc<F>,
    view: V,
    settings: ZoomSettings,
    inputs: mpsc::Receiver<Input>,
    // Weak so the loop ends once every handle is dropped
    loopback: mpsc::WeakSender<Input>,
}

impl<F, V> ZoomController<F, V>
where
    F: LayerFetcher + 'static,
    V: MapView + 'static,
{
    pub fn new(
        fetcher: F,
        view: V,
        settings: ZoomSettings,
        initial_zoom: f64,
    ) -> (Self, ControllerHandle) {
        let (tx, inputs) = mpsc::channel(CHANNEL_CAPACITY);
        let controller = Self {
            switcher: ZoomSwitcher::new(&settings, initial_zoom),
            cache: ClientLayerCache::new(settings.cache_max_entries),
            debounce: Debouncer::new(),
            settle: Debouncer::new(),
            fetcher: Arc::new(fetcher),
            view,
            settings,
            inputs,
            loopback: tx.downgrade(),
        };
        (controller, ControllerHandle { tx })
    }

    /// Process inputs until every [`ControllerHandle`] is dropped
    pub async fn run(mut self) -> V {
        while let Some(input) = self.inputs.recv().await {
            self.dispatch(input);
        }
        self.debounce.cancel();
        self.settle.cancel();
        tracing::debug!("Zoom controller stopped");
        self.view
    }

    fn dispatch(&mut self, input: Input) {
        match input {
            Input::Event(event) => self.apply(event),
            Input::Fetched { layer, tier, ticket, result } => match result {
                Ok(document) => {
                    // Valid whatever the switcher decides to show
                    self.cache.insert(&layer, tier, Arc::new(document));
                    self.apply(Event::FetchSucceeded { tier, ticket });
                }
                Err(e) => {
                    self.apply(Event::FetchFailed { tier, ticket, reason: e.to_string() });
                }
            },
            Input::ZoomToArea { bounds, zoom } => {
                self.apply(Event::OverrideStarted);
                self.view.set_view(bounds, zoom);
                self.apply(Event::ZoomChanged(zoom));
            }
        }
    }

    fn apply(&mut self, event: Event) {
        let cache = &self.cache;
        let probe = |layer: &str, tier: Tier| cache.contains(layer, tier);
        let commands = self.switcher.handle(event, &probe);
        for command in commands {
            self.execute(command);
        }
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::ScheduleDebounce { ticket, delay } => {
                if let Some(tx) = self.loopback.upgrade() {
                    self.debounce.schedule(delay, tx, Input::Event(Event::DebounceElapsed(ticket)));
                }
            }
            Command::CancelDebounce => self.debounce.cancel(),
            Command::ScheduleSettle { ticket, delay } => {
                if let Some(tx) = self.loopback.upgrade() {
                    self.settle.schedule(delay, tx, Input::Event(Event::OverrideEnded(ticket)));
                }
            }
            Command::Fetch { layer, tier, ticket } => self.spawn_fetch(layer, tier, ticket),
            Command::RenderFromCache { layer, tier } => match self.cache.get(&layer, tier) {
                Some(document) => {
                    tracing::info!(
                        layer = %layer,
                        tier = %tier,
                        features = document.feature_count(),
                        "Rendering layer"
                    );
                    self.view.render(&document);
                }
                None => {
                    tracing::warn!(layer = %layer, tier = %tier, "Layer left the cache before rendering")
                }
            },
            Command::ShowError(reason) => self.view.show_error(&reason),
            Command::ClearError => self.view.clear_error(),
        }
    }

    fn spawn_fetch(&self, layer: String, tier: Tier, ticket: u64) {
        let Some(tx) = self.loopback.upgrade() else {
            return;
        };
        let fetcher = Arc::clone(&self.fetcher);
        let tolerance = tier.tolerance(self.settings.simplify_tolerance);

        tokio::spawn(async move {
            let result = fetcher.fetch(&layer, tolerance).await.map(|collection| LayerDocument {
                layer: layer.clone(),
                tier,
                collection,
            });
            let _ = tx.send(Input::Fetched { layer, tier, ticket, result }).await;
        });
    }
}
