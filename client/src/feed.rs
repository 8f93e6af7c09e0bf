//! Bundled data feed.
//!
//! Layers, alerts and timeline events ship as JSON arrays, either in a local
//! directory or under an HTTP base URL. Every fetch degrades to an empty
//! collection: a missing file or unreachable host is logged and the dashboard
//! starts without that data. Individual records that fail to decode are
//! skipped.

use std::path::PathBuf;

use geoharmony_shared::{Alert, FeatureCollection, Layer, LayerData, LayerKind, TimelineEvent};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{
    ALERTS_FILE, EVENTS_FILE, LAYERS_FILE, data_dir, data_url, feed_connect_timeout,
    feed_http_timeout,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Directory(PathBuf),
    Http { base_url: String },
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("{path} is not valid JSON: {source}")]
    Decode {
        path: String,
        source: serde_json::Error,
    },
    #[error("{0} must contain a JSON array")]
    NotAnArray(String),
}

/// Everything the dashboard loads at startup.
#[derive(Debug, Clone, Default)]
pub struct FeedBundle {
    pub layers: Vec<Layer>,
    pub alerts: Vec<Alert>,
    pub events: Vec<TimelineEvent>,
}

#[derive(Debug, Clone)]
pub struct DataFeed {
    source: FeedSource,
    client: reqwest::Client,
}

impl DataFeed {
    pub fn new(source: FeedSource) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("geoharmony/0.1")
            .timeout(feed_http_timeout())
            .connect_timeout(feed_connect_timeout())
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build configured HTTP client, using defaults");
                reqwest::Client::new()
            });
        Self { source, client }
    }

    /// `GEOHARMONY_DATA_URL` when set, otherwise `GEOHARMONY_DATA_DIR`.
    pub fn from_env() -> Self {
        let source = match data_url() {
            Some(base_url) => FeedSource::Http { base_url },
            None => FeedSource::Directory(data_dir()),
        };
        Self::new(source)
    }

    pub fn source(&self) -> &FeedSource {
        &self.source
    }

    async fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>, FeedError> {
        match &self.source {
            FeedSource::Directory(dir) => {
                let path = dir.join(path);
                tokio::fs::read(path.clone())
                    .await
                    .map_err(|source| FeedError::Io { path, source })
            }
            FeedSource::Http { base_url } => {
                let url = if path.starts_with("http://") || path.starts_with("https://") {
                    path.to_string()
                } else {
                    format!("{}/{}", base_url, path.trim_start_matches('/'))
                };
                let resp = self.client.get(&url).send().await?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(FeedError::Status { url, status });
                }
                Ok(resp.bytes().await?.to_vec())
            }
        }
    }

    async fn fetch_json(&self, path: &str) -> Result<Value, FeedError> {
        let bytes = self.fetch_bytes(path).await?;
        serde_json::from_slice(&bytes).map_err(|source| FeedError::Decode {
            path: path.to_string(),
            source,
        })
    }

    async fn fetch_records<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, FeedError> {
        let Value::Array(rows) = self.fetch_json(path).await? else {
            return Err(FeedError::NotAnArray(path.to_string()));
        };
        let total = rows.len();
        let records: Vec<T> = rows
            .into_iter()
            .enumerate()
            .filter_map(|(index, row)| match serde_json::from_value(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(file = path, index, error = %e, "skipping malformed record");
                    None
                }
            })
            .collect();
        debug!(file = path, total, kept = records.len(), "decoded feed records");
        Ok(records)
    }

    async fn records_or_empty<T: DeserializeOwned>(&self, path: &str) -> Vec<T> {
        match self.fetch_records(path).await {
            Ok(records) => records,
            Err(e) => {
                warn!(file = path, error = %e, "feed unavailable, continuing without it");
                Vec::new()
            }
        }
    }

    /// Layer catalogue with external GeoJSON resolved.
    pub async fn fetch_layer_catalogue(&self) -> Vec<Layer> {
        let mut layers: Vec<Layer> = self.records_or_empty(LAYERS_FILE).await;
        for layer in &mut layers {
            let needs_fetch = layer.kind == LayerKind::Geojson
                && layer.features().is_some_and(FeatureCollection::is_empty);
            if let (true, Some(url)) = (needs_fetch, layer.data_url.clone()) {
                layer.data = LayerData::Features(self.fetch_geojson(&url).await);
            }
        }
        layers
    }

    pub async fn fetch_alerts(&self) -> Vec<Alert> {
        self.records_or_empty(ALERTS_FILE).await
    }

    pub async fn fetch_events(&self) -> Vec<TimelineEvent> {
        self.records_or_empty(EVENTS_FILE).await
    }

    /// A FeatureCollection file, empty when it cannot be fetched or decoded.
    pub async fn fetch_geojson(&self, path: &str) -> FeatureCollection {
        let decoded = match self.fetch_json(path).await {
            Ok(value) => serde_json::from_value(value).map_err(|source| FeedError::Decode {
                path: path.to_string(),
                source,
            }),
            Err(e) => Err(e),
        };
        decoded.unwrap_or_else(|e| {
            warn!(file = path, error = %e, "geojson unavailable, using empty collection");
            FeatureCollection::default()
        })
    }

    pub async fn load_all(&self) -> FeedBundle {
        let (layers, alerts, events) = tokio::join!(
            self.fetch_layer_catalogue(),
            self.fetch_alerts(),
            self.fetch_events()
        );
        info!(
            layers = layers.len(),
            alerts = alerts.len(),
            events = events.len(),
            "feed loaded"
        );
        FeedBundle {
            layers,
            alerts,
            events,
        }
    }
}
