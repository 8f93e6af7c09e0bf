use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use geoharmony_client::{Dashboard, DataFeed, Drawable, FeedSource, MemorySurface};
use serde_json::{Value, json};

fn write(dir: &Path, name: &str, value: Value) {
    fs::write(dir.join(name), serde_json::to_vec_pretty(&value).unwrap()).unwrap();
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn seed(dir: &Path) {
    write(
        dir,
        "layers.json",
        json!([
            {
                "id": "flood-zones", "name": "Flood Zones", "type": "geojson",
                "category": "floods", "group": "Hazards",
                "tabAssociations": ["floods"], "visible": false, "color": "#2196F3",
                "data": {
                    "type": "FeatureCollection",
                    "features": [
                        { "type": "Feature", "properties": { "name": "Zone A", "date": "2026-06-15T00:00:00Z" },
                          "geometry": { "type": "Polygon", "coordinates": [[[29.5, 7.2], [30.5, 7.2], [30.5, 8.2], [29.5, 8.2], [29.5, 7.2]]] } },
                        { "type": "Feature", "properties": { "name": "Zone B", "date": "2026-06-16T06:00:00Z" },
                          "geometry": { "type": "Polygon", "coordinates": [[[31.0, 8.0], [32.0, 8.0], [32.0, 9.0], [31.0, 9.0], [31.0, 8.0]]] } }
                    ]
                }
            },
            {
                "id": "incidents", "name": "Conflict Incidents", "type": "csv",
                "group": "Security", "tabAssociations": ["conflict-risk"], "visible": true,
                "color": "#ff00ff",
                "data": [
                    { "latitude": 7.8, "longitude": 30.2, "name": "Incident 1" },
                    { "latitude": "n/a", "longitude": 30.5, "name": "Incident 2" }
                ]
            },
            {
                "id": "precip", "name": "Precipitation", "type": "raster",
                "group": "Weather", "tabAssociations": ["floods", "conflict-risk"], "visible": true,
                "tileUrl": "https://tiles.example.org/default/{z}/{x}/{y}.png",
                "tileUrlsByDate": { "2026-06-16": "https://tiles.example.org/2026-06-16/{z}/{x}/{y}.png" },
                "opacity": 0.6
            },
            {
                "id": "broken", "type": "geojson", "tabAssociations": ["conflict-risk"], "visible": true,
                "data": { "type": "FeatureCollection", "features": [
                    { "type": "Feature", "properties": {}, "geometry": { "type": "Point", "coordinates": null } }
                ] }
            }
        ]),
    );
    write(
        dir,
        "alerts.json",
        json!([
            { "id": "a1", "title": "Drought Warning", "description": "", "severity": "warning",
              "date": "2026-06-15", "latitude": 7.55, "longitude": 30.45 },
            { "id": "a2", "title": "Food Security Crisis", "description": "", "severity": "alert",
              "date": "2026-06-16", "admin2_region": "Jonglei" }
        ]),
    );
    write(
        dir,
        "events.json",
        json!([
            { "date": "2026-06-10T08:00:00Z", "narrative_id": "Y1", "event": "Clashes reported",
              "location": { "name": "Bor", "lat": 6.2, "lon": 31.56, "admin1": "Jonglei", "admin2": "Bor South" } },
            { "date": "2026-06-14T08:00:00Z", "narrative_id": "Y1", "event": "Displacement",
              "location": { "name": "Pibor", "lat": 6.8, "lon": 33.13, "admin1": "Jonglei", "admin2": "Pibor" } }
        ]),
    );
}

fn assert_unique(ids: &[String]) {
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len(), "duplicate drawables: {ids:?}");
}

fn sorted(mut ids: Vec<String>) -> Vec<String> {
    ids.sort();
    ids
}

#[tokio::test]
async fn operator_session_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());

    let surface = MemorySurface::new();
    let feed = DataFeed::new(FeedSource::Directory(dir.path().to_path_buf()));
    let mut dashboard = Dashboard::from_feed(&feed, surface.clone()).await;

    // Initial pass: the broken layer fails alone.
    let report = dashboard.tick().unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(sorted(surface.live_ids()), vec!["incidents", "precip"]);
    let Some(Drawable::PointGroup { points, .. }) = surface.live_drawable("incidents") else {
        panic!("expected point group");
    };
    assert_eq!(points.len(), 1);

    // Identical state: no surface traffic.
    surface.clear_calls();
    dashboard.set_active_category("map");
    dashboard.set_active_category("conflict-risk");
    dashboard.tick();
    assert_eq!(surface.call_count(), 0);

    // Switching tabs surfaces the flood layer and drops incidents.
    assert!(dashboard.set_active_category("floods"));
    dashboard.tick();
    assert_eq!(sorted(surface.live_ids()), vec!["flood-zones", "precip"]);
    let Some(Drawable::Features { features, .. }) = surface.live_drawable("flood-zones") else {
        panic!("expected features");
    };
    assert_eq!(features.len(), 1);

    // Show an alert, then move the date past it.
    assert!(dashboard.toggle_alert_active("a1"));
    assert!(!dashboard.toggle_alert_active("a2"));
    dashboard.tick();
    assert!(surface.live_ids().contains(&"a1".to_string()));
    assert!(dashboard.focus_on_alert("a1"));

    dashboard.set_selected_date(Some(day(2026, 6, 16)));
    let report = dashboard.tick().unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(report.replaced, 2);
    assert!(dashboard.active_alerts().is_empty());
    assert_eq!(sorted(surface.live_ids()), vec!["flood-zones", "precip"]);
    let Some(Drawable::Tiles { url, style, .. }) = surface.live_drawable("precip") else {
        panic!("expected tiles");
    };
    assert_eq!(url, "https://tiles.example.org/2026-06-16/{z}/{x}/{y}.png");
    assert_eq!(style.opacity, 0.6);

    // A day without a tile entry falls back to the configured URL.
    dashboard.set_selected_date(Some(day(2026, 6, 20)));
    dashboard.tick();
    let Some(Drawable::Tiles { url, .. }) = surface.live_drawable("precip") else {
        panic!("expected tiles");
    };
    assert_eq!(url, "https://tiles.example.org/default/{z}/{x}/{y}.png");
    assert_unique(&surface.live_ids());

    // Timeline focus and event window.
    assert_eq!(dashboard.visible_events().len(), 2);
    assert!(dashboard.focus_timeline("Y1"));
    assert!(!dashboard.focus_timeline("nope"));

    dashboard.teardown();
    assert_eq!(surface.live_count(), 0);
}

#[tokio::test]
async fn empty_feed_still_runs() {
    let dir = tempfile::tempdir().unwrap();
    let surface = MemorySurface::new();
    let feed = DataFeed::new(FeedSource::Directory(dir.path().join("missing")));
    let mut dashboard = Dashboard::from_feed(&feed, surface.clone()).await;

    let report = dashboard.tick().unwrap();
    assert!(report.is_noop());
    assert!(dashboard.filtered_layers().is_empty());
    assert!(!dashboard.focus_on_alert("a1"));
}

#[test]
fn rapid_toggles_settle_on_latest_state() {
    let surface = MemorySurface::new();
    let layers = serde_json::from_value(json!([
        { "id": "A", "type": "marker", "tabAssociations": ["conflict-risk"], "visible": true,
          "data": [{ "latitude": 4.85, "longitude": 31.6 }] },
        { "id": "B", "type": "marker", "tabAssociations": ["conflict-risk"], "visible": false,
          "data": [{ "latitude": 9.53, "longitude": 31.66 }] }
    ]))
    .unwrap();
    let store = geoharmony_client::MapStore::new(layers, Vec::new(), Vec::new());
    let mut dashboard = Dashboard::new(store, surface.clone());
    dashboard.tick();

    for _ in 0..3 {
        dashboard.toggle_layer("A");
        dashboard.toggle_layer("B");
    }
    assert!(dashboard.tick().is_some());
    assert!(dashboard.tick().is_none());
    assert_eq!(surface.live_ids(), vec!["B"]);
}
