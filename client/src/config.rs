use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use geoharmony_shared::{DateRange, LatLng};

/// Category under which every visible layer is drawn regardless of tab.
pub const MAP_CATEGORY: &str = "map";
pub const DEFAULT_CATEGORY: &str = "conflict-risk";

pub const DEFAULT_SELECTED_DATE: (i32, u32, u32) = (2026, 6, 15);
pub const DATE_RANGE_START: (i32, u32, u32) = (2026, 1, 1);
pub const DATE_RANGE_END: (i32, u32, u32) = (2026, 12, 31);

// Alert and timeline focus
pub const POINT_FOCUS_ZOOM: u8 = 10;
pub const REGION_FOCUS_ZOOM: u8 = 9;
pub const TIMELINE_FOCUS_ZOOM: u8 = 10;
pub const FIT_BOUNDS_PADDING_PX: u32 = 50;
pub const FIT_BOUNDS_MAX_ZOOM: u8 = 10;
pub const TIMELINE_WINDOW_DAYS: i64 = 10;

// Alert geometry
pub const POINT_ALERT_BOUNDS_PAD_DEG: f64 = 0.1;
pub const REGION_ALERT_BOUNDS_PAD_DEG: f64 = 0.5;
pub const REGION_ALERT_RADIUS_M: f64 = 50_000.0;

/// Centroid used for admin regions missing from `ADMIN_REGION_CENTROIDS`.
pub const DEFAULT_REGION_CENTROID: LatLng = LatLng::new(7.5, 30.0);

/// (admin2 region, lat, lon)
pub const ADMIN_REGION_CENTROIDS: &[(&str, f64, f64)] = &[
    ("Jonglei", 8.5, 31.5),
    ("Eastern Equatoria", 4.5, 33.5),
    ("Western Equatoria", 5.5, 28.0),
    ("Central Equatoria", 4.8, 31.0),
    ("Western Bahr el Ghazal", 8.5, 25.5),
];

/// Layers that switch the base map to the topographic style while visible.
pub const ALTERNATE_BASE_LAYER_IDS: &[&str] = &["idp"];

// Data feed
pub const LAYERS_FILE: &str = "layers.json";
pub const ALERTS_FILE: &str = "alerts.json";
pub const EVENTS_FILE: &str = "events.json";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_FEED_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_FEED_CONNECT_TIMEOUT_SECS: u64 = 3;

pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

fn ymd((y, m, d): (i32, u32, u32)) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

pub fn default_selected_date() -> Option<NaiveDate> {
    ymd(DEFAULT_SELECTED_DATE)
}

pub fn default_date_range() -> DateRange {
    let start = ymd(DATE_RANGE_START).unwrap_or(NaiveDate::MIN);
    let end = ymd(DATE_RANGE_END).unwrap_or(NaiveDate::MAX);
    DateRange::new(start, end)
}

pub fn region_centroid(region: &str) -> LatLng {
    ADMIN_REGION_CENTROIDS
        .iter()
        .find(|(name, _, _)| *name == region)
        .map(|&(_, lat, lng)| LatLng::new(lat, lng))
        .unwrap_or(DEFAULT_REGION_CENTROID)
}

pub fn data_dir() -> PathBuf {
    std::env::var("GEOHARMONY_DATA_DIR")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Base URL of a hosted data bundle. Takes precedence over `data_dir()`.
pub fn data_url() -> Option<String> {
    std::env::var("GEOHARMONY_DATA_URL")
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| value.starts_with("http://") || value.starts_with("https://"))
}

pub fn feed_http_timeout() -> Duration {
    std::env::var("FEED_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_FEED_HTTP_TIMEOUT_SECS))
}

pub fn feed_connect_timeout() -> Duration {
    std::env::var("FEED_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_FEED_CONNECT_TIMEOUT_SECS))
}

pub fn frame_interval() -> Duration {
    std::env::var("FRAME_INTERVAL_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_inside_the_range() {
        let range = default_date_range();
        let selected = default_selected_date().unwrap();
        assert!(range.contains(selected));
        assert_eq!(range.days(), 365);
    }

    #[test]
    fn unknown_regions_fall_back_to_default_centroid() {
        assert_eq!(region_centroid("Jonglei"), LatLng::new(8.5, 31.5));
        assert_eq!(region_centroid("Upper Nile"), DEFAULT_REGION_CENTROID);
    }

    #[test]
    fn frame_interval_reads_env_and_rejects_zero() {
        temp_env::with_var("FRAME_INTERVAL_MS", Some("33"), || {
            assert_eq!(frame_interval(), Duration::from_millis(33));
        });
        temp_env::with_var("FRAME_INTERVAL_MS", Some("0"), || {
            assert_eq!(frame_interval(), Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS));
        });
        temp_env::with_var("FRAME_INTERVAL_MS", Some("soon"), || {
            assert_eq!(frame_interval(), Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS));
        });
    }

    #[test]
    fn data_url_requires_http_scheme() {
        temp_env::with_var("GEOHARMONY_DATA_URL", Some("https://cdn.example.org/bundle/"), || {
            assert_eq!(data_url().as_deref(), Some("https://cdn.example.org/bundle"));
        });
        temp_env::with_var("GEOHARMONY_DATA_URL", Some("ftp://nope"), || {
            assert_eq!(data_url(), None);
        });
    }

    #[test]
    fn data_dir_ignores_blank_values() {
        temp_env::with_var("GEOHARMONY_DATA_DIR", Some("  "), || {
            assert_eq!(data_dir(), PathBuf::from(DEFAULT_DATA_DIR));
        });
        temp_env::with_var("GEOHARMONY_DATA_DIR", Some("/srv/bundle"), || {
            assert_eq!(data_dir(), PathBuf::from("/srv/bundle"));
        });
    }

    #[test]
    fn feed_timeouts_read_env() {
        temp_env::with_vars(
            [
                ("FEED_HTTP_TIMEOUT_SECS", Some("2")),
                ("FEED_CONNECT_TIMEOUT_SECS", None),
            ],
            || {
                assert_eq!(feed_http_timeout(), Duration::from_secs(2));
                assert_eq!(
                    feed_connect_timeout(),
                    Duration::from_secs(DEFAULT_FEED_CONNECT_TIMEOUT_SECS)
                );
            },
        );
    }
}
