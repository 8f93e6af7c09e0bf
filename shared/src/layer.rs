use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::features::{FeatureCollection, Properties};
use crate::geometry::LatLng;

pub const DEFAULT_LAYER_COLOR: &str = "#3388ff";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerKind {
    Geojson,
    /// Tabular point rows, historically shipped as CSV.
    #[serde(rename = "csv", alias = "tabular-points")]
    TabularPoints,
    Marker,
    Raster,
}

impl LayerKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Geojson => "geojson",
            Self::TabularPoints => "csv",
            Self::Marker => "marker",
            Self::Raster => "raster",
        }
    }
}

/// Kind-dependent layer payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LayerData {
    Features(FeatureCollection),
    Points(Vec<PointRecord>),
    Tiles(TileSource),
}

impl LayerData {
    /// `true` when there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Features(collection) => collection.is_empty(),
            Self::Points(points) => points.is_empty(),
            Self::Tiles(source) => source.tile_url.as_deref().is_none_or(str::is_empty),
        }
    }
}

/// Raster source: the active URL plus per-day alternatives keyed `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileSource {
    pub tile_url: Option<String>,
    pub tile_urls_by_date: BTreeMap<String, String>,
}

/// One row of a tabular-points or marker layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointRecord {
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Only string dates count. Anything else leaves the row undated, as for features.
    #[serde(default, deserialize_with = "string_only", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(flatten)]
    pub properties: Properties,
}

impl PointRecord {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            ..Self::default()
        }
    }

    pub fn dated(mut self, date: &str) -> Self {
        self.date = Some(date.to_string());
        self
    }

    /// Drawable position, `None` for missing or out-of-range coordinates.
    pub fn position(&self) -> Option<LatLng> {
        let point = LatLng::new(self.latitude?, self.longitude?);
        point.is_valid().then_some(point)
    }
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn string_only<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

#[derive(Debug, Error)]
pub enum LayerError {
    #[error("layer {id}: {kind} data is not a FeatureCollection: {source}")]
    NotFeatureCollection {
        id: String,
        kind: &'static str,
        source: serde_json::Error,
    },
    #[error("layer {id}: {kind} data must be an array of point records")]
    NotPointArray { id: String, kind: &'static str },
}

/// One entry of the layer catalogue.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "LayerRecord")]
pub struct Layer {
    pub id: String,
    pub name: String,
    pub kind: LayerKind,
    pub category: String,
    pub group: String,
    pub tab_associations: BTreeSet<String>,
    pub visible: bool,
    pub color: String,
    pub opacity: Option<f32>,
    pub min_zoom: Option<u8>,
    pub max_zoom: Option<u8>,
    pub data: LayerData,
    /// External GeoJSON resolved by the feed when `data` is absent.
    pub data_url: Option<String>,
}

impl Layer {
    pub fn new(id: &str, kind: LayerKind, data: LayerData) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            kind,
            category: String::new(),
            group: String::new(),
            tab_associations: BTreeSet::new(),
            visible: true,
            color: DEFAULT_LAYER_COLOR.to_string(),
            opacity: None,
            min_zoom: None,
            max_zoom: None,
            data,
            data_url: None,
        }
    }

    pub fn with_tabs<'a>(mut self, tabs: impl IntoIterator<Item = &'a str>) -> Self {
        self.tab_associations = tabs.into_iter().map(str::to_string).collect();
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn is_associated_with(&self, category: &str) -> bool {
        self.tab_associations.contains(category)
    }

    pub fn has_drawable_data(&self) -> bool {
        !self.data.is_empty()
    }

    pub fn features(&self) -> Option<&FeatureCollection> {
        match &self.data {
            LayerData::Features(collection) => Some(collection),
            _ => None,
        }
    }

    /// CRC32 over everything that shapes this layer's drawable.
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(self.kind.as_str().as_bytes());
        hasher.update(self.color.as_bytes());
        hasher.update(&self.opacity.unwrap_or(-1.0).to_le_bytes());
        hasher.update(&[
            self.min_zoom.unwrap_or(u8::MAX),
            self.max_zoom.unwrap_or(u8::MAX),
        ]);
        let payload = match &self.data {
            // The by-date table never reaches the surface, only the resolved URL does.
            LayerData::Tiles(source) => serde_json::to_vec(&source.tile_url),
            data => serde_json::to_vec(data),
        };
        hasher.update(&payload.unwrap_or_default());
        hasher.finalize()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayerRecord {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type", alias = "kind")]
    kind: LayerKind,
    #[serde(default)]
    category: String,
    #[serde(default)]
    group: String,
    #[serde(default)]
    tab_associations: BTreeSet<String>,
    #[serde(default)]
    visible: bool,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    opacity: Option<f32>,
    #[serde(default)]
    min_zoom: Option<u8>,
    #[serde(default)]
    max_zoom: Option<u8>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    data_url: Option<String>,
    #[serde(default)]
    tile_url: Option<String>,
    #[serde(default)]
    tile_urls_by_date: BTreeMap<String, String>,
}

impl TryFrom<LayerRecord> for Layer {
    type Error = LayerError;

    fn try_from(record: LayerRecord) -> Result<Self, Self::Error> {
        let data = match record.kind {
            LayerKind::Geojson => match record.data {
                None | Some(Value::Null) => LayerData::Features(FeatureCollection::default()),
                Some(value) => LayerData::Features(serde_json::from_value(value).map_err(
                    |source| LayerError::NotFeatureCollection {
                        id: record.id.clone(),
                        kind: record.kind.as_str(),
                        source,
                    },
                )?),
            },
            LayerKind::TabularPoints | LayerKind::Marker => match record.data {
                None | Some(Value::Null) => LayerData::Points(Vec::new()),
                Some(Value::Array(rows)) => LayerData::Points(decode_points(&record.id, rows)),
                Some(_) => {
                    return Err(LayerError::NotPointArray {
                        id: record.id,
                        kind: record.kind.as_str(),
                    });
                }
            },
            LayerKind::Raster => LayerData::Tiles(TileSource {
                tile_url: record.tile_url,
                tile_urls_by_date: record.tile_urls_by_date,
            }),
        };

        Ok(Self {
            name: record.name.unwrap_or_else(|| record.id.clone()),
            id: record.id,
            kind: record.kind,
            category: record.category,
            group: record.group,
            tab_associations: record.tab_associations,
            visible: record.visible,
            color: record
                .color
                .unwrap_or_else(|| DEFAULT_LAYER_COLOR.to_string()),
            opacity: record.opacity,
            min_zoom: record.min_zoom,
            max_zoom: record.max_zoom,
            data,
            data_url: record.data_url,
        })
    }
}

fn decode_points(layer_id: &str, rows: Vec<Value>) -> Vec<PointRecord> {
    rows.into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value(row) {
            Ok(point) => Some(point),
            Err(e) => {
                tracing::warn!(layer = layer_id, index, error = %e, "skipping malformed point record");
                None
            }
        })
        .collect()
}
