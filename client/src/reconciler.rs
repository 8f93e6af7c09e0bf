//! Keeps the drawing surface in step with the store.
//!
//! The reconciler is the single owner of live drawables. Store observers only
//! poke the pass gate; the actual diff runs on the next `tick()`, reading the
//! latest store state at that moment. Surface calls happen with no store
//! borrow held, so a surface callback that issues store commands simply
//! schedules one more pass.

use std::collections::HashSet;

use geoharmony_shared::{Alert, LatLng, LatLngBounds};

use crate::drawable::{alert_drawable, layer_drawable};
use crate::registry::{DrawnEntry, DrawnLayerRegistry, Partition};
use crate::scheduler::PassGate;
use crate::store::{DesiredLayers, ObserverId, StoreHandle};
use crate::surface::{BaseMap, FocusRequest, MapSurface, PointerSubscription};

/// What one pass did to the surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub created: usize,
    pub removed: usize,
    pub replaced: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl PassReport {
    /// `true` when the pass touched no drawable.
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.removed == 0 && self.replaced == 0
    }
}

pub struct Reconciler<S: MapSurface> {
    store: StoreHandle,
    surface: S,
    registry: DrawnLayerRegistry<S::Handle>,
    gate: PassGate,
    observer: Option<ObserverId>,
    base_map: Option<BaseMap>,
    torn_down: bool,
}

impl<S: MapSurface> Reconciler<S> {
    /// Wire a reconciler to the store and schedule the initial pass.
    pub fn attach(store: StoreHandle, surface: S) -> Self {
        let gate = PassGate::new();
        let requester = gate.clone();
        let observer = store.subscribe(move |change| {
            if requester.request() {
                tracing::trace!(?change, "reconcile pass scheduled");
            }
        });
        gate.request();
        Self {
            store,
            surface,
            registry: DrawnLayerRegistry::new(),
            gate,
            observer: Some(observer),
            base_map: None,
            torn_down: false,
        }
    }

    /// Run the scheduled pass, if there is one.
    pub fn tick(&mut self) -> Option<PassReport> {
        if self.torn_down {
            return None;
        }
        let guard = self.gate.begin()?;
        let report = self.reconcile();
        drop(guard);
        Some(report)
    }

    pub fn gate(&self) -> &PassGate {
        &self.gate
    }

    pub fn registry(&self) -> &DrawnLayerRegistry<S::Handle> {
        &self.registry
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn focus(&mut self, request: FocusRequest) {
        if self.torn_down {
            return;
        }
        request.apply(&mut self.surface);
    }

    pub fn subscribe_pointer(&mut self, callback: Box<dyn FnMut(LatLng)>) -> PointerSubscription {
        if self.torn_down {
            return PointerSubscription::noop();
        }
        self.surface.on_pointer_move(callback)
    }

    fn reconcile(&mut self) -> PassReport {
        let (layers, alerts, alternate_base) = self.store.read(|store| {
            (
                store.desired_layers(),
                store.active_alerts(),
                store.showing_alternate_base(),
            )
        });

        let mut report = PassReport::default();
        self.reconcile_layers(&layers, &mut report);
        let new_bounds = self.reconcile_alerts(&alerts, &mut report);
        for (id, bounds) in new_bounds {
            self.store.record_alert_bounds(&id, bounds);
        }

        let base = if alternate_base {
            BaseMap::Topographic
        } else {
            BaseMap::Standard
        };
        if self.base_map != Some(base) {
            self.surface.set_base_map(base);
            self.base_map = Some(base);
        }

        tracing::debug!(
            created = report.created,
            removed = report.removed,
            replaced = report.replaced,
            unchanged = report.unchanged,
            failed = report.failed,
            "reconcile pass finished"
        );
        report
    }

    fn remove_stale(&mut self, partition: Partition, desired: &HashSet<&str>, report: &mut PassReport) {
        for id in self.registry.ids(partition) {
            if desired.contains(id.as_str()) {
                continue;
            }
            if let Some(entry) = self.registry.take(partition, &id) {
                self.surface.remove_drawable(entry.handle);
                report.removed += 1;
            }
        }
    }

    fn reconcile_layers(&mut self, layers: &DesiredLayers, report: &mut PassReport) {
        let desired: HashSet<&str> = layers.ids().into_iter().collect();
        self.remove_stale(Partition::Layers, &desired, report);

        for (layer, fingerprint) in layers.iter() {
            let replacing = match self.registry.get(Partition::Layers, &layer.id) {
                Some(entry) if entry.fingerprint == fingerprint => {
                    report.unchanged += 1;
                    continue;
                }
                Some(_) => true,
                None => false,
            };

            // Content changed or never drawn: anything on the surface for this id is stale.
            if let Some(stale) = self.registry.take(Partition::Layers, &layer.id) {
                self.surface.remove_drawable(stale.handle);
            }

            let drawable = match layer_drawable(layer) {
                Ok(drawable) => drawable,
                Err(e) => {
                    tracing::warn!(layer = %layer.id, error = %e, "failed to build layer drawable");
                    if replacing {
                        report.removed += 1;
                    }
                    report.failed += 1;
                    continue;
                }
            };
            match self.surface.create_drawable(&drawable) {
                Ok(handle) => {
                    self.registry.register(
                        Partition::Layers,
                        &layer.id,
                        DrawnEntry {
                            handle,
                            fingerprint,
                        },
                    );
                    if replacing {
                        report.replaced += 1;
                    } else {
                        report.created += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(layer = %layer.id, error = %e, "surface rejected layer drawable");
                    if replacing {
                        report.removed += 1;
                    }
                    report.failed += 1;
                }
            }
        }
    }

    /// Returns bounds of alerts drawn for the first time.
    fn reconcile_alerts(
        &mut self,
        alerts: &[Alert],
        report: &mut PassReport,
    ) -> Vec<(String, LatLngBounds)> {
        let desired: HashSet<&str> = alerts.iter().map(|alert| alert.id.as_str()).collect();
        self.remove_stale(Partition::Alerts, &desired, report);

        let mut new_bounds = Vec::new();
        for alert in alerts {
            let fingerprint = alert.fingerprint();
            let replacing = match self.registry.get(Partition::Alerts, &alert.id) {
                Some(entry) if entry.fingerprint == fingerprint => {
                    report.unchanged += 1;
                    continue;
                }
                Some(_) => true,
                None => false,
            };
            if let Some(stale) = self.registry.take(Partition::Alerts, &alert.id) {
                self.surface.remove_drawable(stale.handle);
            }

            let (drawable, bounds) = match alert_drawable(alert) {
                Ok(built) => built,
                Err(e) => {
                    tracing::warn!(alert = %alert.id, error = %e, "failed to build alert drawable");
                    if replacing {
                        report.removed += 1;
                    }
                    report.failed += 1;
                    continue;
                }
            };
            match self.surface.create_drawable(&drawable) {
                Ok(handle) => {
                    self.registry.register(
                        Partition::Alerts,
                        &alert.id,
                        DrawnEntry {
                            handle,
                            fingerprint,
                        },
                    );
                    if replacing {
                        report.replaced += 1;
                    } else {
                        report.created += 1;
                    }
                    if alert.bounds.is_none()
                        && let Some(bounds) = bounds
                    {
                        new_bounds.push((alert.id.clone(), bounds));
                    }
                }
                Err(e) => {
                    tracing::warn!(alert = %alert.id, error = %e, "surface rejected alert drawable");
                    if replacing {
                        report.removed += 1;
                    }
                    report.failed += 1;
                }
            }
        }
        new_bounds
    }

    /// Remove every live drawable exactly once and stop reacting to the store.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.gate.cancel();
        if let Some(observer) = self.observer.take() {
            self.store.unsubscribe(observer);
        }
        let drained = self.registry.drain_all();
        let count = drained.len();
        for (_, _, entry) in drained {
            self.surface.remove_drawable(entry.handle);
        }
        tracing::info!(removed = count, "reconciler torn down");
    }
}

impl<S: MapSurface> Drop for Reconciler<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}
