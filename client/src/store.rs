//! Dashboard state and its observer handle.
//!
//! `MapStore` owns every piece of operator-facing state and the collections
//! derived from it. Mutations go through `StoreHandle`, which notifies
//! observers after the store borrow is released so an observer may read the
//! store (or issue further commands) without tripping the `RefCell`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use chrono::NaiveDate;
use geoharmony_shared::timeline::{events_for_timeline, events_in_window, timeline_events};
use geoharmony_shared::{Alert, DateRange, LatLngBounds, Layer, TimelineEvent, filter_layers};

use crate::alerts::AlertStore;
use crate::catalogue::{LayerCatalogue, LayerGroup};
use crate::config::{
    MAP_CATEGORY, TIMELINE_FOCUS_ZOOM, TIMELINE_WINDOW_DAYS, default_date_range,
    default_selected_date,
};
use crate::surface::FocusRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    LayerVisibility(String),
    ActiveCategory(String),
    SelectedDate(Option<NaiveDate>),
    AlertActivation,
    DataLoaded,
}

/// Filtered layers picked for the map, each with its content fingerprint.
/// Shares the store's filtered allocation instead of copying payloads.
#[derive(Debug, Clone, Default)]
pub struct DesiredLayers {
    layers: Arc<Vec<Layer>>,
    picks: Vec<(usize, u32)>,
}

impl DesiredLayers {
    pub fn iter(&self) -> impl Iterator<Item = (&Layer, u32)> + '_ {
        self.picks
            .iter()
            .filter_map(|&(index, fingerprint)| Some((self.layers.get(index)?, fingerprint)))
    }

    pub fn ids(&self) -> Vec<&str> {
        self.iter().map(|(layer, _)| layer.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.picks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct MapStore {
    catalogue: LayerCatalogue,
    alerts: AlertStore,
    events: Vec<TimelineEvent>,
    date_range: DateRange,
    selected_date: Option<NaiveDate>,
    filtered_layers: Arc<Vec<Layer>>,
    /// Parallel to `filtered_layers`, recomputed only when it is.
    fingerprints: Vec<u32>,
}

impl Default for MapStore {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new())
    }
}

impl MapStore {
    pub fn new(layers: Vec<Layer>, alerts: Vec<Alert>, events: Vec<TimelineEvent>) -> Self {
        Self::with_dates(
            layers,
            alerts,
            events,
            default_date_range(),
            default_selected_date(),
        )
    }

    pub fn with_dates(
        layers: Vec<Layer>,
        alerts: Vec<Alert>,
        events: Vec<TimelineEvent>,
        date_range: DateRange,
        selected_date: Option<NaiveDate>,
    ) -> Self {
        let selected_date = selected_date.map(|day| date_range.clamp(day));
        let mut store = Self {
            catalogue: LayerCatalogue::new(layers),
            alerts: AlertStore::new(alerts, selected_date),
            events,
            date_range,
            selected_date,
            filtered_layers: Arc::default(),
            fingerprints: Vec::new(),
        };
        store.refilter();
        store
    }

    pub fn catalogue(&self) -> &LayerCatalogue {
        &self.catalogue
    }

    pub fn alert_store(&self) -> &AlertStore {
        &self.alerts
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn date_range(&self) -> DateRange {
        self.date_range
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.selected_date
    }

    pub fn active_category(&self) -> &str {
        self.catalogue.active_category()
    }

    /// Every catalogue layer with its payload narrowed to the selected day.
    pub fn filtered_layers(&self) -> Arc<Vec<Layer>> {
        self.filtered_layers.clone()
    }

    pub fn filtered_alerts(&self) -> Arc<Vec<Alert>> {
        self.alerts.filtered_alerts()
    }

    pub fn active_alerts(&self) -> Vec<Alert> {
        self.alerts.active_alerts()
    }

    pub fn showing_alternate_base(&self) -> bool {
        self.catalogue.showing_alternate_base()
    }

    pub fn layer_groups(&self) -> Vec<LayerGroup> {
        self.catalogue.groups()
    }

    /// Events from the timeline window ending on the selected day.
    pub fn visible_events(&self) -> Vec<TimelineEvent> {
        match self.selected_date {
            Some(day) => events_in_window(&self.events, day, TIMELINE_WINDOW_DAYS),
            None => self.events.clone(),
        }
    }

    /// Filtered layers that should be on the map right now, in catalogue order.
    pub fn desired_layers(&self) -> DesiredLayers {
        let category = self.active_category();
        let picks = self
            .filtered_layers
            .iter()
            .zip(&self.fingerprints)
            .enumerate()
            .filter(|(_, (layer, _))| {
                layer.visible
                    && (category == MAP_CATEGORY || layer.is_associated_with(category))
                    && layer.has_drawable_data()
            })
            .map(|(index, (_, &fingerprint))| (index, fingerprint))
            .collect();
        DesiredLayers {
            layers: self.filtered_layers.clone(),
            picks,
        }
    }

    /// Pan to the latest event of a timeline up to the selected day.
    pub fn timeline_focus(&self, timeline_id: &str) -> Option<FocusRequest> {
        let latest = match self.selected_date {
            Some(day) => timeline_events(&self.events, timeline_id, day).pop(),
            None => events_for_timeline(&self.events, timeline_id)
                .into_iter()
                .max_by_key(|event| event.instant()),
        }?;
        let center = latest.location.position();
        center.is_valid().then_some(FocusRequest::PanTo {
            center,
            zoom: TIMELINE_FOCUS_ZOOM,
        })
    }

    fn refilter(&mut self) {
        let filtered = filter_layers(self.catalogue.list_layers(), self.selected_date);
        self.fingerprints = filtered.iter().map(Layer::fingerprint).collect();
        self.filtered_layers = Arc::new(filtered);
    }

    pub fn toggle_layer(&mut self, id: &str) -> bool {
        let changed = self.catalogue.toggle_visible(id);
        if changed {
            self.refilter();
        }
        changed
    }

    pub fn set_active_category(&mut self, category: &str) -> bool {
        let changed = self.catalogue.set_active_category(category);
        if changed {
            self.refilter();
        }
        changed
    }

    /// Select a day, clamped into the date range. `None` disables filtering.
    pub fn set_selected_date(&mut self, selected: Option<NaiveDate>) -> bool {
        let selected = selected.map(|day| self.date_range.clamp(day));
        if selected == self.selected_date {
            return false;
        }
        self.selected_date = selected;
        let deactivated = self.alerts.set_selected_date(selected);
        if !deactivated.is_empty() {
            tracing::debug!(alerts = ?deactivated, "date change deactivated alerts");
        }
        self.refilter();
        true
    }

    pub fn toggle_alert_active(&mut self, id: &str) -> bool {
        self.alerts.toggle_active(id)
    }

    pub fn show_all_alerts(&mut self) -> bool {
        self.alerts.activate_all()
    }

    pub fn hide_all_alerts(&mut self) -> bool {
        self.alerts.clear_active()
    }

    pub fn record_alert_bounds(&mut self, id: &str, bounds: LatLngBounds) -> bool {
        self.alerts.record_bounds(id, bounds)
    }

    /// Replace every loaded collection. Active category and date stay.
    pub fn load(&mut self, layers: Vec<Layer>, alerts: Vec<Alert>, events: Vec<TimelineEvent>) {
        self.catalogue.replace(layers);
        self.alerts.set_alerts(alerts);
        self.events = events;
        self.refilter();
        tracing::info!(
            layers = self.catalogue.list_layers().len(),
            alerts = self.alerts.alerts().len(),
            events = self.events.len(),
            "dashboard data loaded"
        );
    }
}

type Observer = Rc<dyn Fn(&StoreChange)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId(u64);

struct Shared {
    store: RefCell<MapStore>,
    observers: RefCell<Vec<(ObserverId, Observer)>>,
    next_observer: Cell<u64>,
}

/// Shared handle to the store. Clones point at the same state.
#[derive(Clone)]
pub struct StoreHandle {
    shared: Rc<Shared>,
}

impl StoreHandle {
    pub fn new(store: MapStore) -> Self {
        Self {
            shared: Rc::new(Shared {
                store: RefCell::new(store),
                observers: RefCell::new(Vec::new()),
                next_observer: Cell::new(0),
            }),
        }
    }

    pub fn subscribe(&self, observer: impl Fn(&StoreChange) + 'static) -> ObserverId {
        let id = ObserverId(self.shared.next_observer.get());
        self.shared.next_observer.set(id.0 + 1);
        self.shared
            .observers
            .borrow_mut()
            .push((id, Rc::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: ObserverId) {
        self.shared
            .observers
            .borrow_mut()
            .retain(|(existing, _)| *existing != id);
    }

    pub fn observer_count(&self) -> usize {
        self.shared.observers.borrow().len()
    }

    pub fn read<R>(&self, f: impl FnOnce(&MapStore) -> R) -> R {
        f(&*self.shared.store.borrow())
    }

    fn update(&self, change: StoreChange, f: impl FnOnce(&mut MapStore) -> bool) -> bool {
        let changed = f(&mut *self.shared.store.borrow_mut());
        if changed {
            self.notify(&change);
        }
        changed
    }

    fn notify(&self, change: &StoreChange) {
        let observers: Vec<Observer> = self
            .shared
            .observers
            .borrow()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            observer(change);
        }
    }

    pub fn toggle_layer(&self, id: &str) -> bool {
        self.update(StoreChange::LayerVisibility(id.to_string()), |store| {
            store.toggle_layer(id)
        })
    }

    pub fn set_active_category(&self, category: &str) -> bool {
        self.update(StoreChange::ActiveCategory(category.to_string()), |store| {
            store.set_active_category(category)
        })
    }

    pub fn set_selected_date(&self, selected: Option<NaiveDate>) -> bool {
        let changed = self.shared.store.borrow_mut().set_selected_date(selected);
        if changed {
            let applied = self.read(MapStore::selected_date);
            self.notify(&StoreChange::SelectedDate(applied));
        }
        changed
    }

    pub fn toggle_alert_active(&self, id: &str) -> bool {
        self.update(StoreChange::AlertActivation, |store| store.toggle_alert_active(id))
    }

    pub fn show_all_alerts(&self) -> bool {
        self.update(StoreChange::AlertActivation, MapStore::show_all_alerts)
    }

    pub fn hide_all_alerts(&self) -> bool {
        self.update(StoreChange::AlertActivation, MapStore::hide_all_alerts)
    }

    pub fn load(&self, layers: Vec<Layer>, alerts: Vec<Alert>, events: Vec<TimelineEvent>) {
        self.update(StoreChange::DataLoaded, |store| {
            store.load(layers, alerts, events);
            true
        });
    }

    /// Bounds are bookkeeping for focus, so observers are not notified.
    pub fn record_alert_bounds(&self, id: &str, bounds: LatLngBounds) -> bool {
        self.shared
            .store
            .borrow_mut()
            .record_alert_bounds(id, bounds)
    }
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("observers", &self.observer_count())
            .finish_non_exhaustive()
    }
}
