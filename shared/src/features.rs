use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geometry::{Geometry, GeometryError};

pub type Properties = Map<String, Value>;

fn feature_collection_tag() -> String {
    "FeatureCollection".to_string()
}

fn feature_tag() -> String {
    "Feature".to_string()
}

/// GeoJSON FeatureCollection. Geometry is kept raw until drawn so one bad
/// feature never fails the whole collection at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "feature_collection_tag")]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self {
            kind: feature_collection_tag(),
            features: Vec::new(),
        }
    }
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: feature_collection_tag(),
            features,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_tag")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default)]
    pub properties: Option<Properties>,
    #[serde(default)]
    pub geometry: Value,
}

impl Feature {
    pub fn new(geometry: Value, properties: Properties) -> Self {
        Self {
            kind: feature_tag(),
            id: None,
            properties: Some(properties),
            geometry,
        }
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.as_ref()?.get(key)?.as_str()
    }

    pub fn date(&self) -> Option<&str> {
        self.property_str("date")
    }

    pub fn name(&self) -> Option<&str> {
        self.property_str("name")
    }

    pub fn parsed_geometry(&self) -> Result<Geometry, GeometryError> {
        Geometry::from_value(&self.geometry)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_features_without_properties_or_geometry() {
        let collection: FeatureCollection = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": null, "geometry": null },
                { "type": "Feature", "properties": { "name": "Flood Zone A", "date": "2025-03-15T00:00:00Z" },
                  "geometry": { "type": "Point", "coordinates": [30.0, 7.0] } }
            ]
        }))
        .unwrap();

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.features[0].date(), None);
        assert!(collection.features[0].parsed_geometry().is_err());
        assert_eq!(collection.features[1].name(), Some("Flood Zone A"));
        assert_eq!(collection.features[1].date(), Some("2025-03-15T00:00:00Z"));
        assert!(collection.features[1].parsed_geometry().is_ok());
    }

    #[test]
    fn non_string_dates_are_treated_as_undated() {
        let feature = Feature::new(
            json!(null),
            json!({ "date": 20260615 }).as_object().cloned().unwrap(),
        );
        assert_eq!(feature.date(), None);
    }
}
