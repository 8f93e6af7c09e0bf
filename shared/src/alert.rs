use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::geometry::{LatLng, LatLngBounds};

pub const ALERT_COLOR: &str = "#ef4444";
pub const WARNING_COLOR: &str = "#f59e0b";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Alert,
}

impl Severity {
    pub const fn color(self) -> &'static str {
        match self {
            Self::Warning => WARNING_COLOR,
            Self::Alert => ALERT_COLOR,
        }
    }
}

/// Where an alert sits on the map.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertLocation {
    Point(LatLng),
    /// Raw GeoJSON geometry, validated when drawn.
    Geometry(Value),
    /// Admin-2 region name resolved through a centroid table.
    Region(String),
}

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert {0} has no point, geometry or admin2_region")]
    NoLocation(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AlertRecord", into = "AlertRecord")]
pub struct Alert {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub date: String,
    pub location: AlertLocation,
    /// Filled in the first time the alert is drawn.
    pub bounds: Option<LatLngBounds>,
}

impl Alert {
    pub fn new(id: &str, severity: Severity, date: &str, location: AlertLocation) -> Self {
        Self {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            severity,
            date: date.to_string(),
            location,
            bounds: None,
        }
    }

    pub fn region(&self) -> Option<&str> {
        match &self.location {
            AlertLocation::Region(name) => Some(name),
            _ => None,
        }
    }

    /// CRC32 over what the alert's drawable is built from. Bounds are excluded.
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(self.severity.color().as_bytes());
        match &self.location {
            AlertLocation::Point(point) => {
                hasher.update(b"point");
                hasher.update(&point.lat.to_le_bytes());
                hasher.update(&point.lng.to_le_bytes());
            }
            AlertLocation::Geometry(geometry) => {
                hasher.update(b"geometry");
                hasher.update(&serde_json::to_vec(geometry).unwrap_or_default());
            }
            AlertLocation::Region(region) => {
                hasher.update(b"region");
                hasher.update(region.as_bytes());
            }
        }
        hasher.finalize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AlertRecord {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    severity: Severity,
    date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    geometry: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    admin2_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bounds: Option<LatLngBounds>,
}

impl TryFrom<AlertRecord> for Alert {
    type Error = AlertError;

    fn try_from(record: AlertRecord) -> Result<Self, Self::Error> {
        // Point wins over geometry, geometry over region.
        let location = match (record.latitude, record.longitude) {
            (Some(lat), Some(lng)) => AlertLocation::Point(LatLng::new(lat, lng)),
            _ => match (record.geometry, record.admin2_region) {
                (Some(geometry), _) if !geometry.is_null() => AlertLocation::Geometry(geometry),
                (_, Some(region)) if !region.trim().is_empty() => AlertLocation::Region(region),
                _ => return Err(AlertError::NoLocation(record.id)),
            },
        };

        Ok(Self {
            id: record.id,
            title: record.title,
            description: record.description,
            severity: record.severity,
            date: record.date,
            location,
            bounds: record.bounds,
        })
    }
}

impl From<Alert> for AlertRecord {
    fn from(alert: Alert) -> Self {
        let mut record = Self {
            id: alert.id,
            title: alert.title,
            description: alert.description,
            severity: alert.severity,
            date: alert.date,
            latitude: None,
            longitude: None,
            geometry: None,
            admin2_region: None,
            bounds: alert.bounds,
        };
        match alert.location {
            AlertLocation::Point(point) => {
                record.latitude = Some(point.lat);
                record.longitude = Some(point.lng);
            }
            AlertLocation::Geometry(geometry) => record.geometry = Some(geometry),
            AlertLocation::Region(region) => record.admin2_region = Some(region),
        }
        record
    }
}
