//! Calendar and wall-clock helpers shared by the validator and the solvers.
//!
//! Times travel on the wire as `HH:MM` strings; dates as ISO-8601. Weekly
//! bucketing uses ISO week numbers keyed by `(iso_year, week)` so horizons
//! crossing a year boundary do not merge distinct weeks.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Timelike};

/// Serde adapter for `NaiveTime` fields carried as `HH:MM`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M").map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for dates that may arrive either as `YYYY-MM-DD` or as a
/// full RFC 3339 timestamp (clients send both).
pub mod flexdate {
    use chrono::NaiveDate;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_flexible_date(&raw).map_err(serde::de::Error::custom)
    }
}

/// Parses `YYYY-MM-DD`, falling back to RFC 3339 with the time discarded.
pub fn parse_flexible_date(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive())
}

/// Minutes since midnight.
pub fn minutes_of(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

/// Wall-clock span in hours, `end - start`. Negative when start follows end.
pub fn span_hours(start: NaiveTime, end: NaiveTime) -> f64 {
    (minutes_of(end) - minutes_of(start)) as f64 / 60.0
}

/// Interval overlap on a single date: `[s1, e1)` intersects `[s2, e2)`.
pub fn overlaps(s1: NaiveTime, e1: NaiveTime, s2: NaiveTime, e2: NaiveTime) -> bool {
    !(minutes_of(e1) <= minutes_of(s2) || minutes_of(e2) <= minutes_of(s1))
}

/// Expands a half-open `[start, end)` range into its calendar dates.
pub fn expand_dates(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut cursor = start;
    while cursor < end {
        dates.push(cursor);
        cursor = match cursor.checked_add_days(Days::new(1)) {
            Some(next) => next,
            None => break,
        };
    }
    dates
}

/// ISO week bucket for weekly-hours constraints.
pub fn week_key(date: NaiveDate) -> (i32, u32) {
    let week = date.iso_week();
    (week.year(), week.week())
}

/// Day of week with 0 = Sunday .. 6 = Saturday, matching availability slots.
pub fn weekday_sunday0(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Saturday or Sunday.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)
}
