use std::collections::HashSet;

use geoharmony_shared::Layer;
use serde::Serialize;

use crate::config::{ALTERNATE_BASE_LAYER_IDS, DEFAULT_CATEGORY};

/// Sidebar grouping of layers, in catalogue order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerGroup {
    pub name: String,
    pub layer_ids: Vec<String>,
}

/// The layer list with per-layer visibility and the active category tab.
#[derive(Debug, Clone)]
pub struct LayerCatalogue {
    layers: Vec<Layer>,
    active_category: String,
}

impl Default for LayerCatalogue {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl LayerCatalogue {
    pub fn new(layers: Vec<Layer>) -> Self {
        Self {
            layers: dedupe(layers),
            active_category: DEFAULT_CATEGORY.to_string(),
        }
    }

    pub fn list_layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    pub fn active_category(&self) -> &str {
        &self.active_category
    }

    /// Flip one layer's visibility. Returns `false` for unknown ids.
    pub fn toggle_visible(&mut self, id: &str) -> bool {
        let Some(layer) = self.layers.iter_mut().find(|layer| layer.id == id) else {
            tracing::debug!(layer = id, "toggle for unknown layer ignored");
            return false;
        };
        layer.visible = !layer.visible;
        true
    }

    /// Switch tabs and force every layer associated with the new tab visible.
    /// Returns `true` when anything changed.
    pub fn set_active_category(&mut self, category: &str) -> bool {
        let mut changed = self.active_category != category;
        self.active_category = category.to_string();
        for layer in &mut self.layers {
            if layer.is_associated_with(category) && !layer.visible {
                layer.visible = true;
                changed = true;
            }
        }
        changed
    }

    /// Swap in a new layer list, keeping the active category.
    pub fn replace(&mut self, layers: Vec<Layer>) {
        self.layers = dedupe(layers);
    }

    pub fn groups(&self) -> Vec<LayerGroup> {
        let mut groups: Vec<LayerGroup> = Vec::new();
        for layer in &self.layers {
            match groups.iter_mut().find(|g| g.name == layer.group) {
                Some(group) => group.layer_ids.push(layer.id.clone()),
                None => groups.push(LayerGroup {
                    name: layer.group.clone(),
                    layer_ids: vec![layer.id.clone()],
                }),
            }
        }
        groups
    }

    /// `true` while a layer that needs the topographic base map is visible.
    pub fn showing_alternate_base(&self) -> bool {
        self.layers
            .iter()
            .any(|layer| layer.visible && ALTERNATE_BASE_LAYER_IDS.contains(&layer.id.as_str()))
    }
}

/// Keep the first layer for every id.
fn dedupe(layers: Vec<Layer>) -> Vec<Layer> {
    let mut seen: HashSet<String> = HashSet::with_capacity(layers.len());
    layers
        .into_iter()
        .filter(|layer| {
            let first = seen.insert(layer.id.clone());
            if !first {
                tracing::warn!(layer = %layer.id, "duplicate layer id dropped from catalogue");
            }
            first
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use geoharmony_shared::{FeatureCollection, LayerData, LayerKind};

    use super::*;

    fn layer(id: &str, group: &str, tabs: &[&str], visible: bool) -> Layer {
        let mut layer = Layer::new(
            id,
            LayerKind::Geojson,
            LayerData::Features(FeatureCollection::default()),
        )
        .with_tabs(tabs.iter().copied())
        .with_visible(visible);
        layer.group = group.to_string();
        layer
    }

    #[test]
    fn duplicate_ids_keep_the_first_layer() {
        let mut second = layer("flood", "Hazards", &[], true);
        second.name = "Second flood".to_string();
        let catalogue = LayerCatalogue::new(vec![layer("flood", "Hazards", &[], false), second]);

        assert_eq!(catalogue.list_layers().len(), 1);
        assert!(!catalogue.layer("flood").unwrap().visible);
    }

    #[test]
    fn toggle_unknown_id_is_a_noop() {
        let mut catalogue = LayerCatalogue::new(vec![layer("flood", "Hazards", &[], false)]);
        assert!(!catalogue.toggle_visible("nope"));
        assert!(catalogue.toggle_visible("flood"));
        assert!(catalogue.layer("flood").unwrap().visible);
    }

    #[test]
    fn switching_category_surfaces_associated_layers() {
        let mut catalogue = LayerCatalogue::new(vec![
            layer("A", "Hazards", &["floods"], false),
            layer("B", "Hazards", &["conflict-risk"], false),
        ]);
        assert!(catalogue.set_active_category("floods"));
        assert_eq!(catalogue.active_category(), "floods");
        assert!(catalogue.layer("A").unwrap().visible);
        assert!(!catalogue.layer("B").unwrap().visible);

        assert!(!catalogue.set_active_category("floods"));
    }

    #[test]
    fn groups_follow_first_seen_order() {
        let catalogue = LayerCatalogue::new(vec![
            layer("admin1", "Boundaries", &[], true),
            layer("flood", "Hazards", &[], true),
            layer("admin2", "Boundaries", &[], true),
        ]);
        let groups = catalogue.groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "Boundaries");
        assert_eq!(groups[0].layer_ids, vec!["admin1", "admin2"]);
    }

    #[test]
    fn alternate_base_follows_idp_visibility() {
        let mut catalogue = LayerCatalogue::new(vec![layer("idp", "Population", &[], false)]);
        assert!(!catalogue.showing_alternate_base());
        catalogue.toggle_visible("idp");
        assert!(catalogue.showing_alternate_base());
    }
}
