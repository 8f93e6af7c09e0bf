//! Day filtering over every dated record type.
//!
//! All functions here are pure: the same catalogue and day always produce
//! equal output, which lets callers cache and compare derived collections.

use chrono::NaiveDate;

use crate::alert::Alert;
use crate::date::{day_key, matches_day};
use crate::features::{Feature, FeatureCollection};
use crate::layer::{Layer, LayerData, PointRecord, TileSource};
use crate::timeline::TimelineEvent;

/// Anything carrying an optional date string.
pub trait Dated {
    fn date(&self) -> Option<&str>;
}

impl Dated for Feature {
    fn date(&self) -> Option<&str> {
        Feature::date(self)
    }
}

impl Dated for PointRecord {
    fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }
}

impl Dated for Alert {
    fn date(&self) -> Option<&str> {
        Some(&self.date)
    }
}

impl Dated for TimelineEvent {
    fn date(&self) -> Option<&str> {
        Some(&self.date)
    }
}

/// Keep undated records and those dated on `selected`. `None` passes everything.
pub fn filter_by_date<T: Dated + Clone>(records: &[T], selected: Option<NaiveDate>) -> Vec<T> {
    match selected {
        None => records.to_vec(),
        Some(day) => records
            .iter()
            .filter(|record| matches_day(record.date(), day))
            .cloned()
            .collect(),
    }
}

pub fn filter_features(
    collection: &FeatureCollection,
    selected: Option<NaiveDate>,
) -> FeatureCollection {
    FeatureCollection {
        kind: collection.kind.clone(),
        features: filter_by_date(&collection.features, selected),
    }
}

/// Pick the tile URL for `selected`, keeping the configured URL when the day
/// has no entry or a blank one.
pub fn resolve_tile_url(source: &TileSource, selected: Option<NaiveDate>) -> Option<String> {
    selected
        .and_then(|day| source.tile_urls_by_date.get(&day_key(day)))
        .filter(|url| !url.is_empty())
        .or(source.tile_url.as_ref())
        .cloned()
}

pub fn filter_layer(layer: &Layer, selected: Option<NaiveDate>) -> Layer {
    let data = match &layer.data {
        LayerData::Features(collection) => LayerData::Features(filter_features(collection, selected)),
        LayerData::Points(points) => LayerData::Points(filter_by_date(points, selected)),
        LayerData::Tiles(source) => LayerData::Tiles(TileSource {
            tile_url: resolve_tile_url(source, selected),
            tile_urls_by_date: source.tile_urls_by_date.clone(),
        }),
    };
    Layer {
        data,
        ..layer.clone()
    }
}

pub fn filter_layers(layers: &[Layer], selected: Option<NaiveDate>) -> Vec<Layer> {
    layers.iter().map(|layer| filter_layer(layer, selected)).collect()
}
