//! iCalendar export
//!
//! Turns an itinerary and its flights into an RFC 5545 document. Events are
//! emitted in a fixed order: outbound flight, return flight, then each day's
//! morning, afternoon and evening activities.

use crate::dates;
use crate::{validate_day_structure, DaySlot, FlightBundle, FlightLeg, ItineraryResult};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{Calendar, Component, Event as IcalEvent, EventLike, Property};
use thiserror::Error;
use tracing::{debug, info};

/// Appended to the sanitized city name to form the download filename
pub const FILENAME_SUFFIX: &str = "_itinerary.ics";

const PRODUCT_ID: &str = "-//trip-planner//Itinerary Export//EN";
const UID_DOMAIN: &str = "trip-planner";

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Invalid {leg} flight time: '{date} {time}'")]
    InvalidFlightTime {
        leg: &'static str,
        date: String,
        time: String,
    },

    #[error("Invalid day date: '{0}'")]
    InvalidDayDate(String),

    #[error("Invalid itinerary: {0}")]
    InvalidItinerary(String),

    #[error("Day {day} {slot} activity '{activity}' does not fit on the calendar")]
    ActivityOutOfRange {
        day: u32,
        slot: &'static str,
        activity: String,
    },

    #[error("Local time {time} does not exist in {timezone}")]
    NonexistentLocalTime { time: NaiveDateTime, timezone: Tz },
}

/// Slot start, in hours after midnight of the trip day.
pub fn slot_start_hour(slot: DaySlot) -> i64 {
    match slot {
        DaySlot::Morning => 9,
        DaySlot::Afternoon => 13,
        DaySlot::Evening => 18,
    }
}

/// One VEVENT before serialization
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub uid: String,
    pub summary: String,
    pub description: String,
    pub location: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Rendered calendar and the filename to offer it under
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarExport {
    pub ics: String,
    pub filename: String,
}

/// Escape a TEXT value: backslash, semicolon, comma and line breaks.
///
/// Property values reach the document as given, so escaping happens here.
pub fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                escaped.push_str("\\n");
            }
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Every character outside `[A-Za-z0-9]` becomes `_`.
pub fn calendar_filename(city: &str) -> String {
    let stem: String = city
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}{}", stem, FILENAME_SUFFIX)
}

fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{:.0}", hours)
    } else {
        format!("{}", hours)
    }
}

/// Duration of `hours`, rounded to the minute; `None` when out of range.
fn minutes_span(hours: f64) -> Option<Duration> {
    let minutes = (hours * 60.0).round();
    if !minutes.is_finite() || minutes.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_minutes(minutes as i64)
}

/// Builds calendar documents; local trip times are read in `timezone`
#[derive(Debug, Clone, Copy)]
pub struct CalendarGenerator {
    timezone: Tz,
}

impl Default for CalendarGenerator {
    fn default() -> Self {
        Self { timezone: chrono_tz::UTC }
    }
}

impl CalendarGenerator {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Render the calendar, stamped with the current time.
    pub fn generate(
        &self,
        itinerary: &ItineraryResult,
        city: &str,
        dates: &str,
        flights: Option<&FlightBundle>,
    ) -> Result<CalendarExport, CalendarError> {
        self.generate_at(itinerary, city, dates, flights, Utc::now())
    }

    pub fn generate_at(
        &self,
        itinerary: &ItineraryResult,
        city: &str,
        dates: &str,
        flights: Option<&FlightBundle>,
        now: DateTime<Utc>,
    ) -> Result<CalendarExport, CalendarError> {
        let events = self.build_events(itinerary, city, dates, flights, now)?;
        info!(city, events = events.len(), "Generated calendar");

        Ok(CalendarExport {
            ics: render_calendar(&events, city, dates, now),
            filename: calendar_filename(city),
        })
    }

    /// Derive events in generation order.
    ///
    /// `now` stamps the UIDs so repeated exports of one itinerary do not
    /// collide.
    pub fn build_events(
        &self,
        itinerary: &ItineraryResult,
        city: &str,
        dates: &str,
        flights: Option<&FlightBundle>,
        now: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        validate_day_structure(&itinerary.days).map_err(CalendarError::InvalidItinerary)?;

        let token = now.timestamp_millis();
        let mut events = Vec::new();

        if let Some(outbound) = flights.and_then(|f| f.outbound.as_ref()) {
            events.push(self.flight_event(
                outbound,
                "outbound",
                format!("outbound-flight-{}@{}", token, UID_DOMAIN),
                format!("Flight to {}", city),
            )?);
        }
        if let Some(inbound) = flights.and_then(|f| f.return_leg.as_ref()) {
            events.push(self.flight_event(
                inbound,
                "return",
                format!("return-flight-{}@{}", token, UID_DOMAIN),
                format!("Return flight from {}", city),
            )?);
        }

        for (day_index, day) in itinerary.days.iter().enumerate() {
            let midnight = dates::parse_day_date(&day.day_date)
                .ok_or_else(|| CalendarError::InvalidDayDate(day.day_date.clone()))?
                .and_time(chrono::NaiveTime::MIN);

            for slot in DaySlot::ALL {
                // Back to back from the slot start; may run past midnight.
                let mut offset = Duration::hours(slot_start_hour(slot));
                for (activity_index, activity) in day.slot(slot).iter().enumerate() {
                    let out_of_range = || CalendarError::ActivityOutOfRange {
                        day: day.day_number,
                        slot: slot.as_str(),
                        activity: activity.activity.clone(),
                    };
                    let span = minutes_span(activity.duration_in_hours).ok_or_else(out_of_range)?;
                    let start = midnight.checked_add_signed(offset).ok_or_else(out_of_range)?;
                    let end = start.checked_add_signed(span).ok_or_else(out_of_range)?;
                    offset = offset.checked_add(&span).ok_or_else(out_of_range)?;

                    events.push(CalendarEvent {
                        uid: format!(
                            "{}-{}-{}-{}@{}",
                            slot.as_str(),
                            day_index,
                            activity_index,
                            token,
                            UID_DOMAIN
                        ),
                        summary: activity.activity.clone(),
                        description: format!(
                            "Day {} {} activity: {}\nDuration: {} hour(s)\nTrip: {} ({})",
                            day.day_number,
                            slot.label(),
                            activity.activity,
                            format_hours(activity.duration_in_hours),
                            city,
                            dates
                        ),
                        location: activity.location.clone(),
                        start: self.to_utc(start)?,
                        end: self.to_utc(end)?,
                    });
                }
            }
        }

        debug!(events = events.len(), "Derived calendar events");
        Ok(events)
    }

    fn flight_event(
        &self,
        leg: &FlightLeg,
        direction: &'static str,
        uid: String,
        summary: String,
    ) -> Result<CalendarEvent, CalendarError> {
        let parse = |date: &str, time: &str| {
            dates::parse_display_datetime(date, time).ok_or_else(|| CalendarError::InvalidFlightTime {
                leg: direction,
                date: date.to_string(),
                time: time.to_string(),
            })
        };
        let departure = parse(&leg.departure.date, &leg.departure.time)?;
        let arrival = parse(&leg.arrival.date, &leg.arrival.time)?;

        Ok(CalendarEvent {
            uid,
            summary,
            description: format!(
                "Airline: {}\nDuration: {}\nPrice: {}\nDeparture: {} {} {}\nArrival: {} {} {}",
                leg.airline,
                leg.duration,
                leg.price,
                leg.departure.airport_iata,
                leg.departure.date,
                leg.departure.time,
                leg.arrival.airport_iata,
                leg.arrival.date,
                leg.arrival.time
            ),
            location: leg.departure.airport_iata.clone(),
            start: self.to_utc(departure)?,
            end: self.to_utc(arrival)?,
        })
    }

    fn to_utc(&self, local: NaiveDateTime) -> Result<DateTime<Utc>, CalendarError> {
        self.timezone
            .from_local_datetime(&local)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or(CalendarError::NonexistentLocalTime {
                time: local,
                timezone: self.timezone,
            })
    }
}

fn render_calendar(events: &[CalendarEvent], city: &str, dates: &str, now: DateTime<Utc>) -> String {
    let mut calendar = Calendar::empty();
    calendar
        .append_property(Property::new("VERSION", "2.0"))
        .append_property(Property::new("PRODID", PRODUCT_ID))
        .append_property(Property::new("CALSCALE", "GREGORIAN"))
        .append_property(Property::new("METHOD", "PUBLISH"))
        .name(&escape_text(&format!("{} itinerary ({})", city, dates)));

    for event in events {
        calendar.push(
            IcalEvent::new()
                .uid(&event.uid)
                .summary(&escape_text(&event.summary))
                .description(&escape_text(&event.description))
                .location(&escape_text(&event.location))
                .starts(event.start)
                .ends(event.end)
                .timestamp(now)
                .done(),
        );
    }

    calendar.to_string()
}
