//! Date parsing and display formatting
//!
//! Oracle output carries dates in whatever form the model chose, flight offers
//! carry ISO timestamps, and flight legs are rendered in a UK-style display
//! format (`dd/mm/yyyy`, `HH:MM`). The calendar exporter parses that display
//! format back, so rendering and parsing live side by side here.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::LazyLock;

/// Display format for flight dates
pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";
/// Display format for flight times
pub const DISPLAY_TIME_FORMAT: &str = "%H:%M";
/// Date format expected by the flight offer source
pub const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

static ORDINAL_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").expect("ordinal pattern is valid"));

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

// Day/month is tried before month/day, matching the display format.
const NUMERIC_DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%m/%d/%Y", "%d.%m.%Y"];

const LONG_DATE_FORMATS: &[&str] = &[
    "%d %B %Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%A, %d %B %Y",
    "%A %d %B %Y",
    "%A, %B %d, %Y",
    "%A %B %d, %Y",
];

/// Parse a free-form date string into a calendar date.
pub fn parse_calendar_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, QUERY_DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(timestamp.date_naive());
    }
    if let Some(timestamp) = parse_naive_timestamp(trimmed) {
        return Some(timestamp.date());
    }
    if let Some(date) = NUMERIC_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
    {
        return Some(date);
    }

    let cleaned = ORDINAL_SUFFIX.replace_all(trimmed, "$1");
    LONG_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
}

/// Normalize a free-form date to the `YYYY-MM-DD` form used in flight queries.
pub fn to_query_date(input: &str) -> Option<String> {
    parse_calendar_date(input).map(|date| date.format(QUERY_DATE_FORMAT).to_string())
}

/// Parse an itinerary `dayDate` as a plain calendar date.
///
/// Only the `YYYY-MM-DD` prefix is read. A stored value such as
/// `2024-12-15T00:00:00.000Z` therefore stays on the 15th whatever the
/// time zone it is later rendered in.
pub fn parse_day_date(input: &str) -> Option<NaiveDate> {
    let date_part = input.trim().split('T').next()?;
    NaiveDate::parse_from_str(date_part, QUERY_DATE_FORMAT).ok()
}

/// Parse a flight offer timestamp into its wall-clock time.
///
/// Timestamps without an offset are airport-local already; timestamps with
/// one keep the wall clock of their own offset.
pub fn parse_offer_timestamp(input: &str) -> Option<NaiveDateTime> {
    let trimmed = input.trim();
    DateTime::parse_from_rfc3339(trimmed)
        .map(|timestamp| timestamp.naive_local())
        .ok()
        .or_else(|| parse_naive_timestamp(trimmed))
}

fn parse_naive_timestamp(input: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
}

pub fn display_date(timestamp: &NaiveDateTime) -> String {
    timestamp.format(DISPLAY_DATE_FORMAT).to_string()
}

pub fn display_time(timestamp: &NaiveDateTime) -> String {
    timestamp.format(DISPLAY_TIME_FORMAT).to_string()
}

/// Inverse of [`display_date`] + [`display_time`].
pub fn parse_display_datetime(date: &str, time: &str) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date.trim(), DISPLAY_DATE_FORMAT).ok()?;
    let time = time.trim();
    let time = NaiveTime::parse_from_str(time, DISPLAY_TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
        .ok()?;
    Some(date.and_time(time))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_calendar_date_formats() {
        let expected = ymd(2024, 12, 15);
        for input in [
            "2024-12-15",
            " 2024-12-15 ",
            "2024-12-15T00:00:00.000Z",
            "2024-12-15T10:30:00",
            "15/12/2024",
            "12/15/2024",
            "15 December 2024",
            "15th December 2024",
            "December 15, 2024",
            "Dec 15, 2024",
            "Sunday, December 15th, 2024",
        ] {
            assert_eq!(parse_calendar_date(input), Some(expected), "input: {input}");
        }
    }

    #[test]
    fn test_day_first_wins_when_ambiguous() {
        assert_eq!(parse_calendar_date("03/04/2025"), Some(ymd(2025, 4, 3)));
    }

    #[test]
    fn test_unparseable_dates() {
        assert_eq!(parse_calendar_date(""), None);
        assert_eq!(parse_calendar_date("next weekend"), None);
        assert_eq!(parse_calendar_date("2024-13-45"), None);
    }

    #[test]
    fn test_to_query_date() {
        assert_eq!(to_query_date("December 20, 2024").as_deref(), Some("2024-12-20"));
        assert_eq!(to_query_date("soon"), None);
    }

    #[test]
    fn test_parse_day_date_ignores_time_part() {
        assert_eq!(parse_day_date("2024-12-15T00:00:00.000Z"), Some(ymd(2024, 12, 15)));
        assert_eq!(parse_day_date("2024-12-15"), Some(ymd(2024, 12, 15)));
        assert_eq!(parse_day_date("15/12/2024"), None);
    }

    #[test]
    fn test_offer_timestamp_keeps_wall_clock() {
        let local = parse_offer_timestamp("2024-12-15T10:30:00").unwrap();
        assert_eq!(display_date(&local), "15/12/2024");
        assert_eq!(display_time(&local), "10:30");

        let offset = parse_offer_timestamp("2024-12-15T23:05:00+01:00").unwrap();
        assert_eq!(display_time(&offset), "23:05");
    }

    #[test]
    fn test_display_round_trip_to_the_minute() {
        let original = parse_offer_timestamp("2025-01-02T07:45:59").unwrap();
        let parsed = parse_display_datetime(&display_date(&original), &display_time(&original)).unwrap();
        assert_eq!(parsed, original.date().and_hms_opt(7, 45, 0).unwrap());
    }

    #[test]
    fn test_parse_display_datetime_accepts_seconds() {
        let parsed = parse_display_datetime("15/12/2024", "14:30:00").unwrap();
        assert_eq!(parsed, ymd(2024, 12, 15).and_hms_opt(14, 30, 0).unwrap());
        assert!(parse_display_datetime("2024-12-15", "14:30").is_none());
        assert!(parse_display_datetime("15/12/2024", "2pm").is_none());
    }
}
