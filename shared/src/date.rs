use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Calendar used to truncate timestamps to a day before comparing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarBasis {
    Utc,
    Local,
}

/// Every day-equality comparison in the dashboard goes through this basis.
pub const CALENDAR_BASIS: CalendarBasis = CalendarBasis::Utc;

/// Key format of `tileUrlsByDate` maps and of bare record dates.
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

impl CalendarBasis {
    pub fn day_of(self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Utc => instant.date_naive(),
            Self::Local => instant.with_timezone(&Local).date_naive(),
        }
    }

    /// Interpret a zone-less wall-clock time in this calendar.
    fn instant_of(self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            Self::Utc => Some(naive.and_utc()),
            Self::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }

    /// Parse a record date into an instant. Bare days resolve to midnight.
    pub fn parse_instant(self, raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        for format in NAIVE_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return self.instant_of(naive);
            }
        }
        let day = NaiveDate::parse_from_str(raw, DAY_KEY_FORMAT).ok()?;
        self.start_of_day(day)
    }

    pub fn start_of_day(self, day: NaiveDate) -> Option<DateTime<Utc>> {
        self.instant_of(day.and_hms_opt(0, 0, 0)?)
    }

    /// Truncate a record date to its calendar day.
    pub fn calendar_day(self, raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if let Ok(day) = NaiveDate::parse_from_str(raw, DAY_KEY_FORMAT) {
            return Some(day);
        }
        self.parse_instant(raw).map(|instant| self.day_of(instant))
    }
}

pub fn calendar_day(raw: &str) -> Option<NaiveDate> {
    CALENDAR_BASIS.calendar_day(raw)
}

pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    CALENDAR_BASIS.parse_instant(raw)
}

/// Format a day as a `tileUrlsByDate` key.
pub fn day_key(day: NaiveDate) -> String {
    day.format(DAY_KEY_FORMAT).to_string()
}

/// Undated records, including blank date strings, match every day.
/// Unparseable dates match none.
pub fn matches_day(raw: Option<&str>, selected: NaiveDate) -> bool {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return true;
    };
    match calendar_day(raw) {
        Some(day) => day == selected,
        None => {
            tracing::debug!(date = raw, "unparseable record date excluded from day filter");
            false
        }
    }
}

/// Inclusive range of selectable days. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DateRangeRecord")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct DateRangeRecord {
    start: NaiveDate,
    end: NaiveDate,
}

impl From<DateRangeRecord> for DateRange {
    fn from(record: DateRangeRecord) -> Self {
        Self::new(record.start, record.end)
    }
}

impl DateRange {
    /// Build a range, swapping reversed bounds.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn clamp(&self, day: NaiveDate) -> NaiveDate {
        day.clamp(self.start, self.end)
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}
