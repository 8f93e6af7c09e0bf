//! Kind-specific drawable construction.
//!
//! A `Drawable` is a fully resolved description of what the surface should
//! put on the map: positions are validated, colors parsed and styles filled
//! in, so surfaces never see raw catalogue data.

use geoharmony_shared::colors::layer_color;
use geoharmony_shared::{
    Alert, AlertLocation, Geometry, GeometryError, LatLng, LatLngBounds, Layer, LayerData,
    LayerKind, Properties, Rgb, Severity,
};
use thiserror::Error;

use crate::config::{
    POINT_ALERT_BOUNDS_PAD_DEG, REGION_ALERT_BOUNDS_PAD_DEG, REGION_ALERT_RADIUS_M,
    region_centroid,
};

// Vector layers
pub const FEATURE_STROKE_WEIGHT: f32 = 2.0;
pub const FEATURE_STROKE_OPACITY: f32 = 0.8;
pub const FEATURE_FILL_OPACITY: f32 = 0.4;
pub const POINT_FEATURE_RADIUS: f32 = 8.0;
pub const POINT_FEATURE_STROKE_WEIGHT: f32 = 1.0;
pub const POINT_FEATURE_FILL_OPACITY: f32 = 0.8;

// Point groups
pub const TABULAR_DOT_PX: u16 = 12;
pub const MARKER_SQUARE_PX: u16 = 16;

// Raster
pub const DEFAULT_RASTER_OPACITY: f32 = 1.0;
pub const DEFAULT_RASTER_MIN_ZOOM: u8 = 0;
pub const DEFAULT_RASTER_MAX_ZOOM: u8 = 19;

pub const ALERT_AREA_FILL_OPACITY: f32 = 0.3;

#[derive(Debug, Error)]
pub enum DrawError {
    #[error("layer {layer}: feature {index} has bad geometry: {source}")]
    FeatureGeometry {
        layer: String,
        index: usize,
        source: GeometryError,
    },
    #[error("layer {0}: no tile url for the selected date")]
    NoTileUrl(String),
    #[error("layer {layer}: {kind} payload does not match its kind")]
    PayloadMismatch { layer: String, kind: &'static str },
    #[error("alert {0}: position out of range")]
    AlertPosition(String),
    #[error("alert {id}: bad geometry: {source}")]
    AlertGeometry { id: String, source: GeometryError },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureStyle {
    pub color: Rgb,
    pub weight: f32,
    pub opacity: f32,
    pub fill_opacity: f32,
}

/// Circle marker used for point features of a vector layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleStyle {
    pub radius: f32,
    pub fill: Rgb,
    pub stroke: Rgb,
    pub stroke_weight: f32,
    pub fill_opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawnFeature {
    pub geometry: Geometry,
    pub properties: Properties,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointShape {
    Dot,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointStyle {
    pub shape: PointShape,
    pub size_px: u16,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawnPoint {
    pub position: LatLng,
    pub name: Option<String>,
    pub properties: Properties,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileStyle {
    pub opacity: f32,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Drawable {
    Features {
        layer_id: String,
        features: Vec<DrawnFeature>,
        style: FeatureStyle,
        point_style: CircleStyle,
    },
    PointGroup {
        layer_id: String,
        points: Vec<DrawnPoint>,
        style: PointStyle,
    },
    Tiles {
        layer_id: String,
        url: String,
        style: TileStyle,
    },
    AlertMarker {
        alert_id: String,
        position: LatLng,
        severity: Severity,
        color: Rgb,
    },
    AlertArea {
        alert_id: String,
        geometry: Geometry,
        color: Rgb,
        fill_opacity: f32,
    },
    AlertCircle {
        alert_id: String,
        center: LatLng,
        radius_m: f64,
        color: Rgb,
    },
}

impl Drawable {
    /// Layer or alert id this drawable belongs to.
    pub fn owner_id(&self) -> &str {
        match self {
            Self::Features { layer_id, .. }
            | Self::PointGroup { layer_id, .. }
            | Self::Tiles { layer_id, .. } => layer_id,
            Self::AlertMarker { alert_id, .. }
            | Self::AlertArea { alert_id, .. }
            | Self::AlertCircle { alert_id, .. } => alert_id,
        }
    }

    pub fn is_alert(&self) -> bool {
        matches!(
            self,
            Self::AlertMarker { .. } | Self::AlertArea { .. } | Self::AlertCircle { .. }
        )
    }
}

/// Build the drawable for an already date-filtered layer.
pub fn layer_drawable(layer: &Layer) -> Result<Drawable, DrawError> {
    let color = layer_color(&layer.color, &layer.id);
    match (&layer.kind, &layer.data) {
        (LayerKind::Geojson, LayerData::Features(collection)) => {
            let mut features = Vec::with_capacity(collection.len());
            for (index, feature) in collection.features.iter().enumerate() {
                match feature.parsed_geometry() {
                    Ok(geometry) => features.push(DrawnFeature {
                        geometry,
                        properties: feature.properties.clone().unwrap_or_default(),
                    }),
                    Err(GeometryError::Missing) => {
                        tracing::debug!(layer = %layer.id, index, "feature without geometry skipped");
                    }
                    Err(source) => {
                        return Err(DrawError::FeatureGeometry {
                            layer: layer.id.clone(),
                            index,
                            source,
                        });
                    }
                }
            }
            Ok(Drawable::Features {
                layer_id: layer.id.clone(),
                features,
                style: FeatureStyle {
                    color,
                    weight: FEATURE_STROKE_WEIGHT,
                    opacity: FEATURE_STROKE_OPACITY,
                    fill_opacity: FEATURE_FILL_OPACITY,
                },
                point_style: CircleStyle {
                    radius: POINT_FEATURE_RADIUS,
                    fill: color,
                    stroke: Rgb::BLACK,
                    stroke_weight: POINT_FEATURE_STROKE_WEIGHT,
                    fill_opacity: POINT_FEATURE_FILL_OPACITY,
                },
            })
        }
        (LayerKind::TabularPoints | LayerKind::Marker, LayerData::Points(records)) => {
            let points: Vec<DrawnPoint> = records
                .iter()
                .filter_map(|record| {
                    Some(DrawnPoint {
                        position: record.position()?,
                        name: record.name.clone(),
                        properties: record.properties.clone(),
                    })
                })
                .collect();
            let skipped = records.len() - points.len();
            if skipped > 0 {
                tracing::debug!(layer = %layer.id, skipped, "point records without valid coordinates skipped");
            }
            let (shape, size_px) = match layer.kind {
                LayerKind::Marker => (PointShape::Square, MARKER_SQUARE_PX),
                _ => (PointShape::Dot, TABULAR_DOT_PX),
            };
            Ok(Drawable::PointGroup {
                layer_id: layer.id.clone(),
                points,
                style: PointStyle {
                    shape,
                    size_px,
                    color,
                },
            })
        }
        (LayerKind::Raster, LayerData::Tiles(source)) => {
            let url = source
                .tile_url
                .clone()
                .ok_or_else(|| DrawError::NoTileUrl(layer.id.clone()))?;
            Ok(Drawable::Tiles {
                layer_id: layer.id.clone(),
                url,
                style: TileStyle {
                    opacity: layer.opacity.unwrap_or(DEFAULT_RASTER_OPACITY),
                    min_zoom: layer.min_zoom.unwrap_or(DEFAULT_RASTER_MIN_ZOOM),
                    max_zoom: layer.max_zoom.unwrap_or(DEFAULT_RASTER_MAX_ZOOM),
                },
            })
        }
        (kind, _) => Err(DrawError::PayloadMismatch {
            layer: layer.id.clone(),
            kind: kind.as_str(),
        }),
    }
}

/// Build an alert drawable together with the bounds the alert occupies.
pub fn alert_drawable(alert: &Alert) -> Result<(Drawable, Option<LatLngBounds>), DrawError> {
    let color = layer_color(alert.severity.color(), &alert.id);
    match &alert.location {
        AlertLocation::Point(position) => {
            if !position.is_valid() {
                return Err(DrawError::AlertPosition(alert.id.clone()));
            }
            Ok((
                Drawable::AlertMarker {
                    alert_id: alert.id.clone(),
                    position: *position,
                    severity: alert.severity,
                    color,
                },
                Some(LatLngBounds::around(*position, POINT_ALERT_BOUNDS_PAD_DEG)),
            ))
        }
        AlertLocation::Geometry(raw) => {
            let geometry = Geometry::from_value(raw).map_err(|source| DrawError::AlertGeometry {
                id: alert.id.clone(),
                source,
            })?;
            let bounds = geometry.bounds();
            Ok((
                Drawable::AlertArea {
                    alert_id: alert.id.clone(),
                    geometry,
                    color,
                    fill_opacity: ALERT_AREA_FILL_OPACITY,
                },
                bounds,
            ))
        }
        AlertLocation::Region(region) => {
            let center = region_centroid(region);
            Ok((
                Drawable::AlertCircle {
                    alert_id: alert.id.clone(),
                    center,
                    radius_m: REGION_ALERT_RADIUS_M,
                    color,
                },
                Some(LatLngBounds::around(center, REGION_ALERT_BOUNDS_PAD_DEG)),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use geoharmony_shared::{Feature, FeatureCollection, PointRecord, TileSource};
    use serde_json::json;

    use super::*;
    use crate::config::DEFAULT_REGION_CENTROID;

    fn geojson(id: &str, geometries: Vec<serde_json::Value>) -> Layer {
        let features = geometries
            .into_iter()
            .map(|g| Feature::new(g, json!({ "name": "zone" }).as_object().cloned().unwrap()))
            .collect();
        let mut layer = Layer::new(
            id,
            LayerKind::Geojson,
            LayerData::Features(FeatureCollection::new(features)),
        );
        layer.color = "#2196F3".to_string();
        layer
    }

    #[test]
    fn geojson_layer_carries_uniform_style_and_properties() {
        let layer = geojson(
            "flood",
            vec![
                json!({ "type": "Point", "coordinates": [30.0, 7.0] }),
                json!(null),
                json!({ "type": "LineString", "coordinates": [[30.0, 7.0], [31.0, 8.0]] }),
            ],
        );
        let Drawable::Features {
            features,
            style,
            point_style,
            ..
        } = layer_drawable(&layer).unwrap()
        else {
            panic!("expected features");
        };
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].properties["name"], json!("zone"));
        assert_eq!(style.color, Rgb(0x21, 0x96, 0xf3));
        assert_eq!(style.weight, 2.0);
        assert_eq!(style.fill_opacity, 0.4);
        assert_eq!(point_style.radius, 8.0);
        assert_eq!(point_style.stroke, Rgb::BLACK);
    }

    #[test]
    fn null_coordinates_fail_the_layer() {
        let layer = geojson(
            "broken",
            vec![
                json!({ "type": "Point", "coordinates": [30.0, 7.0] }),
                json!({ "type": "Point", "coordinates": null }),
            ],
        );
        assert!(matches!(
            layer_drawable(&layer),
            Err(DrawError::FeatureGeometry { index: 1, .. })
        ));
    }

    #[test]
    fn point_layers_skip_records_without_coordinates() {
        let mut row = PointRecord::default();
        row.latitude = Some(7.0);
        let layer = Layer::new(
            "incidents",
            LayerKind::TabularPoints,
            LayerData::Points(vec![PointRecord::at(7.8, 30.2), row, PointRecord::at(120.0, 30.0)]),
        );
        let Drawable::PointGroup { points, style, .. } = layer_drawable(&layer).unwrap() else {
            panic!("expected point group");
        };
        assert_eq!(points.len(), 1);
        assert_eq!(style.shape, PointShape::Dot);
        assert_eq!(style.size_px, 12);

        let markers = Layer::new(
            "un-facilities",
            LayerKind::Marker,
            LayerData::Points(vec![PointRecord::at(4.85, 31.6)]),
        );
        let Drawable::PointGroup { style, .. } = layer_drawable(&markers).unwrap() else {
            panic!("expected point group");
        };
        assert_eq!(style.shape, PointShape::Square);
        assert_eq!(style.size_px, 16);
    }

    #[test]
    fn raster_defaults_and_missing_url() {
        let layer = Layer::new(
            "precip",
            LayerKind::Raster,
            LayerData::Tiles(TileSource {
                tile_url: Some("https://tiles/{z}/{x}/{y}".to_string()),
                ..TileSource::default()
            }),
        );
        let Drawable::Tiles { style, .. } = layer_drawable(&layer).unwrap() else {
            panic!("expected tiles");
        };
        assert_eq!(style.opacity, 1.0);
        assert_eq!((style.min_zoom, style.max_zoom), (0, 19));

        let empty = Layer::new("precip", LayerKind::Raster, LayerData::Tiles(TileSource::default()));
        assert!(matches!(layer_drawable(&empty), Err(DrawError::NoTileUrl(_))));
    }

    #[test]
    fn mismatched_payload_is_an_error() {
        let layer = Layer::new("odd", LayerKind::Raster, LayerData::Points(Vec::new()));
        assert!(matches!(
            layer_drawable(&layer),
            Err(DrawError::PayloadMismatch { kind: "raster", .. })
        ));
    }

    #[test]
    fn alert_drawables_by_location() {
        let point = Alert::new(
            "a1",
            Severity::Warning,
            "2026-06-15",
            AlertLocation::Point(LatLng::new(7.55, 30.45)),
        );
        let (drawable, bounds) = alert_drawable(&point).unwrap();
        assert!(matches!(drawable, Drawable::AlertMarker { color: Rgb(0xf5, 0x9e, 0x0b), .. }));
        assert!(bounds.unwrap().contains(LatLng::new(7.6, 30.5)));

        let region = Alert::new(
            "a2",
            Severity::Alert,
            "2026-06-15",
            AlertLocation::Region("Upper Nile".to_string()),
        );
        let (drawable, bounds) = alert_drawable(&region).unwrap();
        let Drawable::AlertCircle { center, radius_m, color, .. } = drawable else {
            panic!("expected circle");
        };
        assert_eq!(center, DEFAULT_REGION_CENTROID);
        assert_eq!(radius_m, 50_000.0);
        assert_eq!(color, Rgb(0xef, 0x44, 0x44));
        assert_eq!(bounds.unwrap().center(), DEFAULT_REGION_CENTROID);

        let area = Alert::new(
            "a3",
            Severity::Alert,
            "2026-06-15",
            AlertLocation::Geometry(json!({
                "type": "Polygon",
                "coordinates": [[[29.5, 7.2], [30.5, 7.2], [30.5, 8.2], [29.5, 8.2], [29.5, 7.2]]]
            })),
        );
        let (drawable, bounds) = alert_drawable(&area).unwrap();
        assert!(matches!(drawable, Drawable::AlertArea { fill_opacity, .. } if fill_opacity == 0.3));
        assert_eq!(bounds.unwrap().north_east, LatLng::new(8.2, 30.5));
    }

    #[test]
    fn invalid_alert_position_is_an_error() {
        let alert = Alert::new(
            "far",
            Severity::Alert,
            "2026-06-15",
            AlertLocation::Point(LatLng::new(91.0, 30.0)),
        );
        assert!(matches!(alert_drawable(&alert), Err(DrawError::AlertPosition(_))));
    }
}
