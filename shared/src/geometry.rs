use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl From<(f64, f64)> for LatLng {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

/// Axis-aligned box in geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn new(a: LatLng, b: LatLng) -> Self {
        Self {
            south_west: LatLng::new(a.lat.min(b.lat), a.lng.min(b.lng)),
            north_east: LatLng::new(a.lat.max(b.lat), a.lng.max(b.lng)),
        }
    }

    /// Square box of `pad` degrees around a point.
    pub fn around(center: LatLng, pad: f64) -> Self {
        Self::new(
            LatLng::new(center.lat - pad, center.lng - pad),
            LatLng::new(center.lat + pad, center.lng + pad),
        )
    }

    pub fn extend(&mut self, point: LatLng) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }

    pub fn contains(&self, point: LatLng) -> bool {
        (self.south_west.lat..=self.north_east.lat).contains(&point.lat)
            && (self.south_west.lng..=self.north_east.lng).contains(&point.lng)
    }
}

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("malformed geometry: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("missing geometry")]
    Missing,
    #[error("invalid position {0:?}")]
    InvalidPosition(Vec<f64>),
    #[error("{kind} needs at least {min} positions, got {got}")]
    TooFewPositions {
        kind: &'static str,
        min: usize,
        got: usize,
    },
}

/// GeoJSON position: `[longitude, latitude, altitude?]`.
pub type Position = Vec<f64>;

/// Validated GeoJSON geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Geometry> },
}

impl Geometry {
    /// Decode and validate a raw GeoJSON geometry value.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, GeometryError> {
        if value.is_null() {
            return Err(GeometryError::Missing);
        }
        let geometry: Geometry = serde_json::from_value(value.clone())?;
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        match self {
            Self::Point { coordinates } => check_position(coordinates),
            Self::MultiPoint { coordinates } => coordinates.iter().try_for_each(|p| check_position(p)),
            Self::LineString { coordinates } => check_path(coordinates, "LineString", 2),
            Self::MultiLineString { coordinates } => coordinates
                .iter()
                .try_for_each(|line| check_path(line, "LineString", 2)),
            Self::Polygon { coordinates } => coordinates
                .iter()
                .try_for_each(|ring| check_path(ring, "Polygon ring", 4)),
            Self::MultiPolygon { coordinates } => coordinates
                .iter()
                .flatten()
                .try_for_each(|ring| check_path(ring, "Polygon ring", 4)),
            Self::GeometryCollection { geometries } => {
                geometries.iter().try_for_each(Geometry::validate)
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Point { .. } => "Point",
            Self::MultiPoint { .. } => "MultiPoint",
            Self::LineString { .. } => "LineString",
            Self::MultiLineString { .. } => "MultiLineString",
            Self::Polygon { .. } => "Polygon",
            Self::MultiPolygon { .. } => "MultiPolygon",
            Self::GeometryCollection { .. } => "GeometryCollection",
        }
    }

    pub fn is_point(&self) -> bool {
        matches!(self, Self::Point { .. } | Self::MultiPoint { .. })
    }

    pub fn for_each_position(&self, f: &mut impl FnMut(LatLng)) {
        let mut visit = |p: &Position| f(LatLng::new(p[1], p[0]));
        match self {
            Self::Point { coordinates } => visit(coordinates),
            Self::MultiPoint { coordinates } | Self::LineString { coordinates } => {
                coordinates.iter().for_each(visit)
            }
            Self::MultiLineString { coordinates } | Self::Polygon { coordinates } => {
                coordinates.iter().flatten().for_each(visit)
            }
            Self::MultiPolygon { coordinates } => {
                coordinates.iter().flatten().flatten().for_each(visit)
            }
            Self::GeometryCollection { geometries } => {
                for geometry in geometries {
                    geometry.for_each_position(f);
                }
            }
        }
    }

    /// Bounding box of every position, `None` for an empty geometry.
    pub fn bounds(&self) -> Option<LatLngBounds> {
        let mut bounds: Option<LatLngBounds> = None;
        self.for_each_position(&mut |point| match bounds.as_mut() {
            Some(b) => b.extend(point),
            None => bounds = Some(LatLngBounds::new(point, point)),
        });
        bounds
    }
}

fn check_position(position: &Position) -> Result<(), GeometryError> {
    let valid = position.len() >= 2
        && position.iter().all(|v| v.is_finite())
        && LatLng::new(position[1], position[0]).is_valid();
    if valid {
        Ok(())
    } else {
        Err(GeometryError::InvalidPosition(position.clone()))
    }
}

fn check_path(path: &[Position], kind: &'static str, min: usize) -> Result<(), GeometryError> {
    if path.len() < min {
        return Err(GeometryError::TooFewPositions {
            kind,
            min,
            got: path.len(),
        });
    }
    path.iter().try_for_each(|p| check_position(p))
}
