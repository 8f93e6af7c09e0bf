use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use geoharmony_shared::{Alert, AlertLocation, LatLngBounds, filter_by_date};

use crate::config::{POINT_FOCUS_ZOOM, REGION_FOCUS_ZOOM, region_centroid};
use crate::surface::{FitOptions, FocusRequest};

/// Alerts with their own show/hide state, filtered by the selected day.
///
/// Active ids are always a subset of the filtered alerts: every recompute
/// prunes ids the date filter no longer lets through.
#[derive(Debug, Clone, Default)]
pub struct AlertStore {
    alerts: Vec<Alert>,
    active: BTreeSet<String>,
    filtered: Arc<Vec<Alert>>,
    selected: Option<NaiveDate>,
}

impl AlertStore {
    pub fn new(alerts: Vec<Alert>, selected: Option<NaiveDate>) -> Self {
        let mut store = Self {
            selected,
            ..Self::default()
        };
        store.set_alerts(alerts);
        store
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn filtered_alerts(&self) -> Arc<Vec<Alert>> {
        self.filtered.clone()
    }

    pub fn active_ids(&self) -> &BTreeSet<String> {
        &self.active
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.contains(id)
    }

    /// Filtered alerts that are switched on, in feed order.
    pub fn active_alerts(&self) -> Vec<Alert> {
        self.filtered
            .iter()
            .filter(|alert| self.active.contains(&alert.id))
            .cloned()
            .collect()
    }

    /// Replace the alert list. Returns the active ids that were dropped.
    pub fn set_alerts(&mut self, alerts: Vec<Alert>) -> Vec<String> {
        let mut seen = HashSet::with_capacity(alerts.len());
        self.alerts = alerts
            .into_iter()
            .filter(|alert| {
                let first = seen.insert(alert.id.clone());
                if !first {
                    tracing::warn!(alert = %alert.id, "duplicate alert id dropped");
                }
                first
            })
            .collect();
        self.recompute()
    }

    /// Returns the active ids the new day deactivated.
    pub fn set_selected_date(&mut self, selected: Option<NaiveDate>) -> Vec<String> {
        self.selected = selected;
        self.recompute()
    }

    fn recompute(&mut self) -> Vec<String> {
        self.filtered = Arc::new(filter_by_date(&self.alerts, self.selected));
        let visible: HashSet<&str> = self.filtered.iter().map(|a| a.id.as_str()).collect();
        let removed: Vec<String> = self
            .active
            .iter()
            .filter(|id| !visible.contains(id.as_str()))
            .cloned()
            .collect();
        for id in &removed {
            self.active.remove(id);
        }
        if !removed.is_empty() {
            tracing::debug!(count = removed.len(), "alerts deactivated by date filter");
        }
        removed
    }

    /// Flip an alert on or off. Ids outside the filtered set are ignored.
    pub fn toggle_active(&mut self, id: &str) -> bool {
        if !self.filtered.iter().any(|alert| alert.id == id) {
            tracing::debug!(alert = id, "toggle for alert outside the filtered set ignored");
            return false;
        }
        if !self.active.remove(id) {
            self.active.insert(id.to_string());
        }
        true
    }

    /// Switch on every filtered alert. Returns `true` when anything changed.
    pub fn activate_all(&mut self) -> bool {
        let before = self.active.len();
        self.active
            .extend(self.filtered.iter().map(|alert| alert.id.clone()));
        self.active.len() != before
    }

    pub fn clear_active(&mut self) -> bool {
        let changed = !self.active.is_empty();
        self.active.clear();
        changed
    }

    /// Camera move that frames the alert. `None` for ids outside the filtered
    /// set and for geometry alerts whose bounds were never computed.
    pub fn focus(&self, id: &str) -> Option<FocusRequest> {
        let alert = self.filtered.iter().find(|alert| alert.id == id)?;
        match &alert.location {
            AlertLocation::Point(center) => Some(FocusRequest::PanTo {
                center: *center,
                zoom: POINT_FOCUS_ZOOM,
            }),
            AlertLocation::Region(region) => Some(FocusRequest::PanTo {
                center: region_centroid(region),
                zoom: REGION_FOCUS_ZOOM,
            }),
            AlertLocation::Geometry(_) => alert.bounds.map(|bounds| FocusRequest::FitBounds {
                bounds,
                options: FitOptions::default(),
            }),
        }
    }

    /// Store bounds computed while drawing. The first write wins.
    pub fn record_bounds(&mut self, id: &str, bounds: LatLngBounds) -> bool {
        let Some(alert) = self.alerts.iter_mut().find(|alert| alert.id == id) else {
            return false;
        };
        if alert.bounds.is_some() {
            return false;
        }
        alert.bounds = Some(bounds);
        if self.filtered.iter().any(|a| a.id == id && a.bounds.is_none()) {
            let filtered = Arc::make_mut(&mut self.filtered);
            if let Some(entry) = filtered.iter_mut().find(|a| a.id == id) {
                entry.bounds = Some(bounds);
            }
        }
        true
    }
}
