//! Host-facing façade: one store, one reconciler, one surface.

use std::sync::Arc;

use chrono::NaiveDate;
use geoharmony_shared::{Alert, Layer, TimelineEvent};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::catalogue::LayerGroup;
use crate::config::frame_interval;
use crate::feed::{DataFeed, FeedBundle};
use crate::pointer::PointerReadout;
use crate::reconciler::{PassReport, Reconciler};
use crate::store::{MapStore, StoreHandle};
use crate::surface::MapSurface;

pub struct Dashboard<S: MapSurface> {
    store: StoreHandle,
    reconciler: Reconciler<S>,
}

impl<S: MapSurface> Dashboard<S> {
    pub fn new(store: MapStore, surface: S) -> Self {
        let store = StoreHandle::new(store);
        let reconciler = Reconciler::attach(store.clone(), surface);
        Self { store, reconciler }
    }

    /// Build a dashboard from whatever the feed can provide.
    pub async fn from_feed(feed: &DataFeed, surface: S) -> Self {
        let FeedBundle {
            layers,
            alerts,
            events,
        } = feed.load_all().await;
        Self::new(MapStore::new(layers, alerts, events), surface)
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn reconciler(&self) -> &Reconciler<S> {
        &self.reconciler
    }

    pub fn reload(&self, bundle: FeedBundle) {
        self.store.load(bundle.layers, bundle.alerts, bundle.events);
    }

    pub fn filtered_layers(&self) -> Arc<Vec<Layer>> {
        self.store.read(MapStore::filtered_layers)
    }

    pub fn filtered_alerts(&self) -> Arc<Vec<Alert>> {
        self.store.read(MapStore::filtered_alerts)
    }

    pub fn active_alerts(&self) -> Vec<Alert> {
        self.store.read(MapStore::active_alerts)
    }

    pub fn showing_alternate_base(&self) -> bool {
        self.store.read(MapStore::showing_alternate_base)
    }

    pub fn visible_events(&self) -> Vec<TimelineEvent> {
        self.store.read(MapStore::visible_events)
    }

    pub fn layer_groups(&self) -> Vec<LayerGroup> {
        self.store.read(MapStore::layer_groups)
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.store.read(MapStore::selected_date)
    }

    pub fn active_category(&self) -> String {
        self.store.read(|store| store.active_category().to_string())
    }

    pub fn toggle_layer(&self, id: &str) -> bool {
        self.store.toggle_layer(id)
    }

    pub fn set_active_category(&self, category: &str) -> bool {
        self.store.set_active_category(category)
    }

    pub fn set_selected_date(&self, selected: Option<NaiveDate>) -> bool {
        self.store.set_selected_date(selected)
    }

    pub fn toggle_alert_active(&self, id: &str) -> bool {
        self.store.toggle_alert_active(id)
    }

    pub fn show_all_alerts(&self) -> bool {
        self.store.show_all_alerts()
    }

    pub fn hide_all_alerts(&self) -> bool {
        self.store.hide_all_alerts()
    }

    /// Move the camera to an alert. Returns `false` when there is nothing to frame.
    pub fn focus_on_alert(&mut self, id: &str) -> bool {
        let Some(request) = self.store.read(|store| store.alert_store().focus(id)) else {
            debug!(alert = id, "no focus target for alert");
            return false;
        };
        self.reconciler.focus(request);
        true
    }

    /// Pan to the latest event of a timeline up to the selected day.
    pub fn focus_timeline(&mut self, timeline_id: &str) -> bool {
        let Some(request) = self.store.read(|store| store.timeline_focus(timeline_id)) else {
            debug!(timeline = timeline_id, "no focus target for timeline");
            return false;
        };
        self.reconciler.focus(request);
        true
    }

    pub fn pointer_readout(&mut self) -> PointerReadout {
        PointerReadout::new(|callback| self.reconciler.subscribe_pointer(callback))
    }

    /// Run the pending reconcile pass, if any. Call once per frame.
    pub fn tick(&mut self) -> Option<PassReport> {
        self.reconciler.tick()
    }

    /// Tick every frame until `shutdown` turns `true` or its sender goes away,
    /// then tear the map down.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(frame_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(frame_ms = frame_interval().as_millis() as u64, "dashboard frame loop started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.teardown();
    }

    pub fn teardown(&mut self) {
        self.reconciler.teardown();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use geoharmony_shared::{AlertLocation, LatLng, LayerData, LayerKind, PointRecord, Severity};

    use super::*;
    use crate::surface::{MemorySurface, SurfaceCall};

    fn dashboard() -> (Dashboard<MemorySurface>, MemorySurface) {
        let surface = MemorySurface::new();
        let layers = vec![
            Layer::new(
                "incidents",
                LayerKind::TabularPoints,
                LayerData::Points(vec![PointRecord::at(7.8, 30.2)]),
            )
            .with_tabs(["conflict-risk"]),
        ];
        let alerts = vec![Alert::new(
            "a1",
            Severity::Alert,
            "2026-06-15",
            AlertLocation::Point(LatLng::new(4.41, 32.57)),
        )];
        (
            Dashboard::new(MapStore::new(layers, alerts, Vec::new()), surface.clone()),
            surface,
        )
    }

    #[test]
    fn focus_on_alert_pans_the_surface() {
        let (mut dashboard, surface) = dashboard();
        assert!(dashboard.focus_on_alert("a1"));
        assert_eq!(surface.view(), Some((LatLng::new(4.41, 32.57), 10)));
        assert!(!dashboard.focus_on_alert("missing"));
    }

    #[test]
    fn commands_reach_the_surface_on_tick() {
        let (mut dashboard, surface) = dashboard();
        dashboard.tick();
        assert_eq!(surface.live_ids(), vec!["incidents"]);

        assert!(dashboard.show_all_alerts());
        assert_eq!(dashboard.active_alerts().len(), 1);
        dashboard.tick();
        assert_eq!(surface.live_count(), 2);

        dashboard.hide_all_alerts();
        dashboard.tick();
        assert_eq!(surface.live_ids(), vec!["incidents"]);
    }

    #[test]
    fn reload_redraws_changed_layers_and_drops_vanished_alerts() {
        let (mut dashboard, surface) = dashboard();
        assert!(dashboard.toggle_alert_active("a1"));
        dashboard.tick();
        assert_eq!(surface.live_count(), 2);

        let moved = Layer::new(
            "incidents",
            LayerKind::TabularPoints,
            LayerData::Points(vec![PointRecord::at(9.5, 31.6)]),
        )
        .with_tabs(["conflict-risk"]);
        dashboard.reload(FeedBundle {
            layers: vec![moved],
            alerts: Vec::new(),
            events: Vec::new(),
        });
        assert!(dashboard.active_alerts().is_empty());
        assert!(dashboard.filtered_alerts().is_empty());

        let report = dashboard.tick().unwrap();
        assert_eq!(report.replaced, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(surface.live_ids(), vec!["incidents"]);
        let Some(crate::drawable::Drawable::PointGroup { points, .. }) =
            surface.live_drawable("incidents")
        else {
            panic!("expected point group");
        };
        assert_eq!(points[0].position, LatLng::new(9.5, 31.6));
        assert!(!dashboard.focus_on_alert("a1"));
    }

    #[test]
    fn pointer_readout_follows_the_surface() {
        let (mut dashboard, surface) = dashboard();
        let readout = dashboard.pointer_readout();
        surface.move_pointer(LatLng::new(7.5, 30.0));
        assert_eq!(
            readout.label().as_deref(),
            Some("Lat: 7.500000° N  Lon: 30.000000° E")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_ticks_until_shutdown() {
        let (mut dashboard, surface) = dashboard();
        let store = dashboard.store().clone();
        let (tx, rx) = watch::channel(false);

        let driver = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            store.toggle_alert_active("a1");
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = tx.send(true);
        };
        tokio::join!(dashboard.run(rx), driver);

        let creates = surface
            .calls()
            .iter()
            .filter(|call| matches!(call, SurfaceCall::Create { .. }))
            .count();
        assert_eq!(creates, 2);
        assert_eq!(surface.live_count(), 0);
        assert!(dashboard.reconciler().is_torn_down());
    }
}
