//! Zoom tier switcher
//!
//! A pure state machine deciding which resolution tier of the selected layer
//! should be on screen. It never touches the network, timers or the map: each
//! [`Event`] yields the [`Command`]s the controller has to carry out.
//!
//! The machine is either `Idle(tier)`, showing `tier`, or `Fetching`, waiting
//! for one outstanding request. Zoom changes that stay on the same side of the
//! threshold produce no commands at all, unless nothing of the selected layer
//! made it onto the map yet.

use std::time::Duration;

use habmap_core::config::ZoomSettings;
use habmap_core::models::Tier;

/// Input to the switcher
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ZoomChanged(f64),
    DebounceElapsed(u64),
    FetchSucceeded { tier: Tier, ticket: u64 },
    FetchFailed { tier: Tier, ticket: u64, reason: String },
    OverrideStarted,
    OverrideEnded(u64),
    LayerSelected(String),
}

/// Side effect requested by the switcher
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Deliver `DebounceElapsed(ticket)` after `delay`, replacing any pending one
    ScheduleDebounce { ticket: u64, delay: Duration },
    CancelDebounce,
    /// Deliver `OverrideEnded(ticket)` after `delay`, replacing any pending one
    ScheduleSettle { ticket: u64, delay: Duration },
    Fetch { layer: String, tier: Tier, ticket: u64 },
    RenderFromCache { layer: String, tier: Tier },
    ShowError(String),
    ClearError,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Idle(Tier),
    Fetching { target: Tier, previous: Tier, ticket: u64 },
}

impl Phase {
    /// Tier currently on screen
    fn shown(&self) -> Tier {
        match *self {
            Phase::Idle(tier) => tier,
            Phase::Fetching { previous, .. } => previous,
        }
    }
}

/// Answers whether the client cache already holds a document
pub trait CacheProbe {
    fn contains(&self, layer: &str, tier: Tier) -> bool;
}

impl<F> CacheProbe for F
where
    F: Fn(&str, Tier) -> bool,
{
    fn contains(&self, layer: &str, tier: Tier) -> bool {
        self(layer, tier)
    }
}

#[derive(Debug, Clone)]
pub struct ZoomSwitcher {
    threshold: f64,
    debounce: Duration,
    settle: Duration,
    zoom: f64,
    phase: Phase,
    layer: Option<String>,
    rendered: Option<(String, Tier)>,
    override_active: bool,
    pending_debounce: Option<u64>,
    pending_settle: Option<u64>,
    error_shown: bool,
    next_ticket: u64,
}

impl ZoomSwitcher {
    pub fn new(settings: &ZoomSettings, initial_zoom: f64) -> Self {
        Self {
            threshold: settings.threshold,
            debounce: settings.debounce,
            settle: settings.settle,
            zoom: initial_zoom,
            phase: Phase::Idle(Tier::for_zoom(initial_zoom, settings.threshold)),
            layer: None,
            rendered: None,
            override_active: false,
            pending_debounce: None,
            pending_settle: None,
            error_shown: false,
            next_ticket: 1,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn layer(&self) -> Option<&str> {
        self.layer.as_deref()
    }

    /// Layer and tier currently drawn on the map
    pub fn rendered(&self) -> Option<(&str, Tier)> {
        self.rendered.as_ref().map(|(layer, tier)| (layer.as_str(), *tier))
    }

    pub fn is_overridden(&self) -> bool {
        self.override_active
    }

    pub fn handle(&mut self, event: Event, cache: &dyn CacheProbe) -> Vec<Command> {
        match event {
            Event::ZoomChanged(zoom) => self.on_zoom(zoom),
            Event::DebounceElapsed(ticket) => self.on_debounce(ticket, cache),
            Event::FetchSucceeded { tier, ticket } => self.on_fetched(tier, ticket),
            Event::FetchFailed { tier, ticket, reason } => self.on_failed(tier, ticket, reason),
            Event::OverrideStarted => self.on_override_started(),
            Event::OverrideEnded(ticket) => self.on_override_ended(ticket, cache),
            Event::LayerSelected(layer) => self.on_layer_selected(layer, cache),
        }
    }

    fn desired(&self) -> Tier {
        Tier::for_zoom(self.zoom, self.threshold)
    }

    /// Whether the selected layer is shown at `tier` or already on its way there
    fn has_settled_on(&self, tier: Tier) -> bool {
        match self.phase {
            Phase::Fetching { target, .. } => target == tier,
            Phase::Idle(_) => match (&self.layer, &self.rendered) {
                (Some(layer), Some((shown, shown_tier))) => shown == layer && *shown_tier == tier,
                _ => false,
            },
        }
    }

    fn take_ticket(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        ticket
    }

    fn cancel_debounce(&mut self) -> Vec<Command> {
        match self.pending_debounce.take() {
            Some(_) => vec![Command::CancelDebounce],
            None => Vec::new(),
        }
    }

    fn on_zoom(&mut self, zoom: f64) -> Vec<Command> {
        self.zoom = zoom;

        // Programmatic zooms are evaluated once they settle
        if self.override_active {
            return Vec::new();
        }

        let desired = self.desired();
        if self.layer.is_none() {
            self.phase = Phase::Idle(desired);
            return Vec::new();
        }

        if self.has_settled_on(desired) {
            // Back on the current side before the window closed
            return self.cancel_debounce();
        }

        let ticket = self.take_ticket();
        self.pending_debounce = Some(ticket);
        vec![Command::ScheduleDebounce { ticket, delay: self.debounce }]
    }

    fn on_debounce(&mut self, ticket: u64, cache: &dyn CacheProbe) -> Vec<Command> {
        if self.pending_debounce != Some(ticket) {
            tracing::trace!(ticket, "Ignoring superseded debounce");
            return Vec::new();
        }
        self.pending_debounce = None;

        if self.override_active {
            return Vec::new();
        }

        let desired = self.desired();
        if self.has_settled_on(desired) {
            return Vec::new();
        }
        self.switch_to(desired, cache)
    }

    fn on_fetched(&mut self, tier: Tier, ticket: u64) -> Vec<Command> {
        let Phase::Fetching { target, previous, ticket: outstanding } = self.phase else {
            tracing::debug!(ticket, %tier, "Discarding response with no fetch outstanding");
            return Vec::new();
        };
        if ticket != outstanding || tier != target {
            tracing::debug!(ticket, %tier, "Discarding stale response");
            return Vec::new();
        }

        // The zoom moved back while the request was in flight
        if !self.override_active && self.desired() != tier {
            tracing::debug!(ticket, %tier, zoom = self.zoom, "Response no longer matches zoom");
            self.phase = Phase::Idle(previous);
            return Vec::new();
        }

        self.phase = Phase::Idle(tier);
        let Some(layer) = self.layer.clone() else {
            return Vec::new();
        };
        self.rendered = Some((layer.clone(), tier));

        let mut commands = vec![Command::RenderFromCache { layer, tier }];
        if std::mem::take(&mut self.error_shown) {
            commands.push(Command::ClearError);
        }
        commands
    }

    fn on_failed(&mut self, tier: Tier, ticket: u64, reason: String) -> Vec<Command> {
        match self.phase {
            Phase::Fetching { previous, ticket: outstanding, .. } if outstanding == ticket => {
                tracing::warn!(%tier, reason = %reason, "Layer fetch failed, keeping {} tier", previous);
                self.phase = Phase::Idle(previous);
                self.error_shown = true;
                vec![Command::ShowError(reason)]
            }
            _ => {
                tracing::debug!(ticket, %tier, "Discarding stale failure");
                Vec::new()
            }
        }
    }

    /// A new override replaces the settle ticket of any earlier one
    fn on_override_started(&mut self) -> Vec<Command> {
        self.override_active = true;
        let ticket = self.take_ticket();
        self.pending_settle = Some(ticket);

        let mut commands = self.cancel_debounce();
        commands.push(Command::ScheduleSettle { ticket, delay: self.settle });
        commands
    }

    fn on_override_ended(&mut self, ticket: u64, cache: &dyn CacheProbe) -> Vec<Command> {
        if self.pending_settle != Some(ticket) {
            tracing::trace!(ticket, "Ignoring superseded settle");
            return Vec::new();
        }
        self.pending_settle = None;
        self.override_active = false;

        let desired = self.desired();
        if self.layer.is_none() {
            self.phase = Phase::Idle(desired);
            return Vec::new();
        }
        if self.has_settled_on(desired) {
            return Vec::new();
        }
        self.switch_to(desired, cache)
    }

    fn on_layer_selected(&mut self, layer: String, cache: &dyn CacheProbe) -> Vec<Command> {
        let desired = self.desired();
        if let Phase::Fetching { target, .. } = self.phase {
            if target == desired && self.layer.as_deref() == Some(layer.as_str()) {
                tracing::debug!(layer = %layer, tier = %desired, "Fetch already in flight");
                return Vec::new();
            }
        }

        let mut commands = self.cancel_debounce();
        self.layer = Some(layer);
        commands.extend(self.switch_to(desired, cache));
        commands
    }

    /// Move to `target` for the selected layer: already drawn, from cache, or fetched
    fn switch_to(&mut self, target: Tier, cache: &dyn CacheProbe) -> Vec<Command> {
        let Some(layer) = self.layer.clone() else {
            self.phase = Phase::Idle(target);
            return Vec::new();
        };

        if self.rendered.as_ref().is_some_and(|(l, t)| *l == layer && *t == target) {
            // Drops any outstanding fetch; its response becomes stale
            self.phase = Phase::Idle(target);
            return Vec::new();
        }

        if cache.contains(&layer, target) {
            self.phase = Phase::Idle(target);
            self.rendered = Some((layer.clone(), target));
            let mut commands = vec![Command::RenderFromCache { layer, tier: target }];
            if std::mem::take(&mut self.error_shown) {
                commands.push(Command::ClearError);
            }
            return commands;
        }

        let ticket = self.take_ticket();
        self.phase = Phase::Fetching { target, previous: self.phase.shown(), ticket };
        vec![Command::Fetch { layer, tier: target, ticket }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ZoomSettings {
        ZoomSettings { threshold: 12.0, ..Default::default() }
    }

    fn empty(_: &str, _: Tier) -> bool {
        false
    }

    fn switches(commands: &[Command]) -> usize {
        commands
            .iter()
            .filter(|c| matches!(c, Command::Fetch { .. } | Command::RenderFromCache { .. }))
            .count()
    }

    /// Switcher showing `layer` at the tier for `zoom`
    fn showing(layer: &str, zoom: f64) -> ZoomSwitcher {
        let mut switcher = ZoomSwitcher::new(&settings(), zoom);
        let commands = switcher.handle(Event::LayerSelected(layer.to_string()), &empty);
        let Some(Command::Fetch { tier, ticket, .. }) = commands.first().cloned() else {
            panic!("expected fetch, got {:?}", commands);
        };
        switcher.handle(Event::FetchSucceeded { tier, ticket }, &empty);
        switcher
    }

    /// Feed a burst of zoom events, then fire the last debounce still pending
    fn zoom_burst(switcher: &mut ZoomSwitcher, zooms: &[f64]) -> Vec<Command> {
        let mut commands = Vec::new();
        let mut last_ticket = None;
        for &zoom in zooms {
            for command in switcher.handle(Event::ZoomChanged(zoom), &empty) {
                match command {
                    Command::ScheduleDebounce { ticket, .. } => last_ticket = Some(ticket),
                    Command::CancelDebounce => last_ticket = None,
                    other => commands.push(other),
                }
            }
        }
        if let Some(ticket) = last_ticket {
            commands.extend(switcher.handle(Event::DebounceElapsed(ticket), &empty));
        }
        commands
    }

    #[test]
    fn test_initial_selection_fetches_tier_for_zoom() {
        let mut switcher = ZoomSwitcher::new(&settings(), 8.0);

        let commands = switcher.handle(Event::LayerSelected("reefs".into()), &empty);

        assert_eq!(
            commands,
            vec![Command::Fetch { layer: "reefs".into(), tier: Tier::Simplified, ticket: 1 }]
        );
        assert!(matches!(switcher.phase(), Phase::Fetching { target: Tier::Simplified, .. }));
    }

    #[test]
    fn test_zoom_on_same_side_never_switches() {
        let mut switcher = showing("reefs", 13.0);

        for zoom in [12.0, 13.0, 12.0] {
            assert!(switcher.handle(Event::ZoomChanged(zoom), &empty).is_empty());
        }
        assert_eq!(switcher.phase(), Phase::Idle(Tier::Full));
    }

    #[test]
    fn test_single_switch_per_threshold_crossing() {
        let mut switcher = showing("reefs", 11.5);
        assert_eq!(switcher.phase(), Phase::Idle(Tier::Simplified));

        let commands = zoom_burst(&mut switcher, &[11.0, 10.0, 9.0, 13.0]);

        assert_eq!(switches(&commands), 1);
        assert!(matches!(
            commands[0],
            Command::Fetch { tier: Tier::Full, .. }
        ));
    }

    #[test]
    fn test_burst_across_threshold_uses_settled_zoom() {
        let mut switcher = showing("reefs", 13.0);

        // Dips below, comes back: nothing to do
        assert!(zoom_burst(&mut switcher, &[11.0, 10.0, 12.5]).is_empty());

        // Rapid crossing collapses to one switch
        let commands = zoom_burst(&mut switcher, &[11.0, 13.0, 10.0]);
        assert_eq!(switches(&commands), 1);
        assert!(matches!(commands[0], Command::Fetch { tier: Tier::Simplified, .. }));
    }

    #[test]
    fn test_superseded_debounce_is_ignored() {
        let mut switcher = showing("reefs", 13.0);

        let first = switcher.handle(Event::ZoomChanged(10.0), &empty);
        let second = switcher.handle(Event::ZoomChanged(9.0), &empty);
        let (Command::ScheduleDebounce { ticket: old, .. }, Command::ScheduleDebounce { ticket: new, delay }) =
            (&first[0], &second[0])
        else {
            panic!("expected debounces: {:?} {:?}", first, second);
        };

        assert_eq!(*delay, Duration::from_millis(300));
        assert!(switcher.handle(Event::DebounceElapsed(*old), &empty).is_empty());
        assert_eq!(switches(&switcher.handle(Event::DebounceElapsed(*new), &empty)), 1);
    }

    #[test]
    fn test_cached_tier_renders_without_fetch() {
        let mut switcher = showing("reefs", 13.0);
        let cached = |layer: &str, tier: Tier| layer == "reefs" && tier == Tier::Simplified;

        let Command::ScheduleDebounce { ticket, .. } = switcher.handle(Event::ZoomChanged(10.0), &cached)[0]
        else {
            panic!("expected debounce");
        };
        let commands = switcher.handle(Event::DebounceElapsed(ticket), &cached);

        assert_eq!(
            commands,
            vec![Command::RenderFromCache { layer: "reefs".into(), tier: Tier::Simplified }]
        );
        assert_eq!(switcher.phase(), Phase::Idle(Tier::Simplified));
        assert_eq!(switcher.rendered(), Some(("reefs", Tier::Simplified)));
    }

    #[test]
    fn test_zoom_during_fetch_does_not_refetch() {
        let mut switcher = showing("reefs", 13.0);
        let commands = zoom_burst(&mut switcher, &[10.0]);
        assert_eq!(switches(&commands), 1);

        // Still heading for simplified
        assert!(switcher.handle(Event::ZoomChanged(9.0), &empty).is_empty());
        assert!(matches!(switcher.phase(), Phase::Fetching { target: Tier::Simplified, .. }));
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut switcher = showing("reefs", 13.0);
        let Command::Fetch { ticket: stale, .. } = zoom_burst(&mut switcher, &[10.0])[0].clone() else {
            panic!("expected fetch");
        };

        // Zoom back in while the simplified request is in flight
        let commands = switcher.handle(Event::ZoomChanged(14.0), &empty);
        assert_eq!(commands, vec![Command::ScheduleDebounce { ticket: stale + 1, delay: Duration::from_millis(300) }]);
        let commands = switcher.handle(Event::DebounceElapsed(stale + 1), &empty);
        // Full is already on screen
        assert!(commands.is_empty());
        assert_eq!(switcher.phase(), Phase::Idle(Tier::Full));

        assert!(switcher.handle(Event::FetchSucceeded { tier: Tier::Simplified, ticket: stale }, &empty).is_empty());
        assert_eq!(switcher.rendered(), Some(("reefs", Tier::Full)));
    }

    #[test]
    fn test_response_for_abandoned_tier_restores_previous() {
        let mut switcher = showing("reefs", 13.0);
        let Command::Fetch { ticket, .. } = zoom_burst(&mut switcher, &[10.0])[0].clone() else {
            panic!("expected fetch");
        };

        // Debounce still pending when the response lands
        switcher.handle(Event::ZoomChanged(14.0), &empty);
        let commands = switcher.handle(Event::FetchSucceeded { tier: Tier::Simplified, ticket }, &empty);

        assert!(commands.is_empty());
        assert_eq!(switcher.phase(), Phase::Idle(Tier::Full));
    }

    #[test]
    fn test_failed_fetch_keeps_previous_tier() {
        let mut switcher = showing("reefs", 11.0);
        let Command::Fetch { ticket, .. } = zoom_burst(&mut switcher, &[14.0])[0].clone() else {
            panic!("expected fetch");
        };

        let commands = switcher.handle(
            Event::FetchFailed { tier: Tier::Full, ticket, reason: "503".into() },
            &empty,
        );

        assert_eq!(commands, vec![Command::ShowError("503".into())]);
        assert_eq!(switcher.phase(), Phase::Idle(Tier::Simplified));
        assert_eq!(switcher.rendered(), Some(("reefs", Tier::Simplified)));

        // Next success clears the indicator
        switcher.handle(Event::ZoomChanged(11.0), &empty);
        let Command::Fetch { ticket, .. } = zoom_burst(&mut switcher, &[15.0])[0].clone() else {
            panic!("expected fetch");
        };
        let commands = switcher.handle(Event::FetchSucceeded { tier: Tier::Full, ticket }, &empty);
        assert_eq!(
            commands,
            vec![Command::RenderFromCache { layer: "reefs".into(), tier: Tier::Full }, Command::ClearError]
        );
    }

    /// Start an override and return its settle ticket
    fn start_override(switcher: &mut ZoomSwitcher) -> u64 {
        let commands = switcher.handle(Event::OverrideStarted, &empty);
        match commands.last() {
            Some(Command::ScheduleSettle { ticket, delay }) => {
                assert_eq!(*delay, Duration::from_millis(1000));
                *ticket
            }
            other => panic!("expected settle, got {:?}", other),
        }
    }

    #[test]
    fn test_override_suppresses_intermediate_zooms() {
        let mut switcher = showing("reefs", 8.0);

        let settle = start_override(&mut switcher);
        for zoom in [10.0, 12.5, 11.0, 14.0] {
            assert!(switcher.handle(Event::ZoomChanged(zoom), &empty).is_empty());
        }

        let commands = switcher.handle(Event::OverrideEnded(settle), &empty);
        assert_eq!(switches(&commands), 1);
        assert!(matches!(commands[0], Command::Fetch { tier: Tier::Full, .. }));
        assert!(!switcher.is_overridden());
    }

    #[test]
    fn test_override_cancels_pending_debounce() {
        let mut switcher = showing("reefs", 8.0);
        switcher.handle(Event::ZoomChanged(13.0), &empty);

        let commands = switcher.handle(Event::OverrideStarted, &empty);
        assert_eq!(commands[0], Command::CancelDebounce);
        let Some(Command::ScheduleSettle { ticket, .. }) = commands.get(1).cloned() else {
            panic!("expected settle, got {:?}", commands);
        };
        switcher.handle(Event::ZoomChanged(9.0), &empty);
        assert!(switcher.handle(Event::OverrideEnded(ticket), &empty).is_empty());
    }

    #[test]
    fn test_earlier_settle_does_not_end_newer_override() {
        let mut switcher = showing("reefs", 8.0);

        let first = start_override(&mut switcher);
        let second = start_override(&mut switcher);
        assert_ne!(first, second);

        // The first animation's settle arrives while the second is still flying
        assert!(switcher.handle(Event::OverrideEnded(first), &empty).is_empty());
        assert!(switcher.is_overridden());
        assert!(switcher.handle(Event::ZoomChanged(14.0), &empty).is_empty());

        let commands = switcher.handle(Event::OverrideEnded(second), &empty);
        assert!(!switcher.is_overridden());
        assert!(matches!(commands[0], Command::Fetch { tier: Tier::Full, .. }));
    }

    #[test]
    fn test_reselecting_layer_with_fetch_in_flight() {
        let mut switcher = ZoomSwitcher::new(&settings(), 13.0);
        let first = switcher.handle(Event::LayerSelected("reefs".into()), &empty);
        assert_eq!(switches(&first), 1);

        assert!(switcher.handle(Event::LayerSelected("reefs".into()), &empty).is_empty());
        assert!(matches!(switcher.phase(), Phase::Fetching { target: Tier::Full, ticket: 1, .. }));

        // A different layer still gets its own request
        let commands = switcher.handle(Event::LayerSelected("kelp".into()), &empty);
        assert_eq!(commands, vec![Command::Fetch { layer: "kelp".into(), tier: Tier::Full, ticket: 2 }]);
    }

    #[test]
    fn test_zoom_retries_after_initial_fetch_failed() {
        let mut switcher = ZoomSwitcher::new(&settings(), 8.0);
        let Command::Fetch { ticket, .. } = switcher.handle(Event::LayerSelected("reefs".into()), &empty)[0].clone()
        else {
            panic!("expected fetch");
        };
        let commands = switcher.handle(
            Event::FetchFailed { tier: Tier::Simplified, ticket, reason: "offline".into() },
            &empty,
        );
        assert_eq!(commands, vec![Command::ShowError("offline".into())]);
        assert_eq!(switcher.rendered(), None);

        // Same side of the threshold, but nothing is on the map yet
        let commands = zoom_burst(&mut switcher, &[9.0]);
        assert_eq!(switches(&commands), 1);
        assert!(matches!(commands[0], Command::Fetch { tier: Tier::Simplified, .. }));
    }

    #[test]
    fn test_reselecting_rendered_layer_short_circuits() {
        let mut switcher = showing("reefs", 13.0);
        let always = |_: &str, _: Tier| true;

        assert!(switcher.handle(Event::LayerSelected("reefs".into()), &always).is_empty());

        let commands = switcher.handle(Event::LayerSelected("kelp".into()), &always);
        assert_eq!(commands, vec![Command::RenderFromCache { layer: "kelp".into(), tier: Tier::Full }]);
    }

    #[test]
    fn test_zoom_without_layer_only_tracks_tier() {
        let mut switcher = ZoomSwitcher::new(&settings(), 8.0);

        assert!(switcher.handle(Event::ZoomChanged(13.0), &empty).is_empty());
        assert_eq!(switcher.phase(), Phase::Idle(Tier::Full));
    }
}
