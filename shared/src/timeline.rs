use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::date::{CALENDAR_BASIS, parse_instant};
use crate::geometry::LatLng;

/// Named place attached to a timeline event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLocation {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub admin1: String,
    #[serde(default)]
    pub admin2: String,
}

impl EventLocation {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lon)
    }
}

/// A single incident report. Reports sharing a `narrative_id` form a timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub date: String,
    pub narrative_id: String,
    pub location: EventLocation,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_referenced: Option<Vec<String>>,
}

impl TimelineEvent {
    pub fn timeline_id(&self) -> &str {
        &self.narrative_id
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        parse_instant(&self.date)
    }
}

/// Last instant of `day`, so "up to the selected day" includes all of it.
fn end_of_day(day: NaiveDate) -> Option<DateTime<Utc>> {
    Some(CALENDAR_BASIS.start_of_day(day.succ_opt()?)? - Duration::milliseconds(1))
}

/// Events dated from `days_back` days before `selected` through the end of `selected`.
pub fn events_in_window(
    events: &[TimelineEvent],
    selected: NaiveDate,
    days_back: i64,
) -> Vec<TimelineEvent> {
    let (Some(earliest), Some(latest)) = (
        selected
            .checked_sub_signed(Duration::days(days_back))
            .and_then(|first| CALENDAR_BASIS.start_of_day(first)),
        end_of_day(selected),
    ) else {
        return Vec::new();
    };
    events
        .iter()
        .filter(|event| {
            event
                .instant()
                .is_some_and(|t| earliest <= t && t <= latest)
        })
        .cloned()
        .collect()
}

pub fn events_for_timeline(events: &[TimelineEvent], timeline_id: &str) -> Vec<TimelineEvent> {
    events
        .iter()
        .filter(|event| event.narrative_id == timeline_id)
        .cloned()
        .collect()
}

/// Events of one timeline up to the end of `selected`, oldest first.
pub fn timeline_events(
    events: &[TimelineEvent],
    timeline_id: &str,
    selected: NaiveDate,
) -> Vec<TimelineEvent> {
    let Some(latest) = end_of_day(selected) else {
        return Vec::new();
    };
    let mut matched: Vec<(DateTime<Utc>, TimelineEvent)> = events
        .iter()
        .filter(|event| event.narrative_id == timeline_id)
        .filter_map(|event| Some((event.instant()?, event.clone())))
        .filter(|(t, _)| *t <= latest)
        .collect();
    matched.sort_by_key(|(t, _)| *t);
    matched.into_iter().map(|(_, event)| event).collect()
}

pub fn group_by_timeline(events: &[TimelineEvent]) -> BTreeMap<String, Vec<TimelineEvent>> {
    let mut groups: BTreeMap<String, Vec<TimelineEvent>> = BTreeMap::new();
    for event in events {
        groups
            .entry(event.narrative_id.clone())
            .or_default()
            .push(event.clone());
    }
    groups
}

/// Timeline ids in first-seen order.
pub fn unique_timeline_ids(events: &[TimelineEvent]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for event in events {
        if !ids.contains(&event.narrative_id) {
            ids.push(event.narrative_id.clone());
        }
    }
    ids
}

/// Latest event of every timeline. Undated events lose to dated ones.
pub fn most_recent_by_timeline(events: &[TimelineEvent]) -> Vec<TimelineEvent> {
    group_by_timeline(events)
        .into_values()
        .filter_map(|group| group.into_iter().max_by_key(|event| event.instant()))
        .collect()
}
