//! # Trip Planner
//!
//! Plans a multi-day trip from a destination, a loose date description and the
//! traveler's coordinates. The planner resolves the nearest departure airport,
//! normalizes the trip dates, looks up a best-effort round-trip flight and asks a
//! structured-output oracle for a day-by-day itinerary. The result can be
//! exported as an iCalendar document.

pub mod airports;
pub mod api;
pub mod calendar;
pub mod client;
pub mod config;
pub mod dates;
pub mod flights;
pub mod logging;
pub mod oracle;
pub mod planner;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export main types for convenience
pub use airports::{AirLabsClient, AirportLookupError, AirportResolver};
pub use calendar::{CalendarError, CalendarEvent, CalendarExport, CalendarGenerator};
pub use client::{AmadeusClient, FlightOfferSource, FlightSearchError};
pub use config::{Config, ConfigError};
pub use flights::FlightSearch;
pub use oracle::{ItineraryContext, OpenAiOracle, OracleError, TripOracle};
pub use planner::TripPlanner;

/// Error taxonomy surfaced by trip planning and calendar export
#[derive(Error, Debug)]
pub enum TripError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Could not resolve trip locations: {0}")]
    Resolution(String),

    #[error("Flight search failed: {0}")]
    FlightSearch(#[from] FlightSearchError),

    #[error("Itinerary generation failed: {0}")]
    Generation(String),

    #[error("Calendar export failed: {0}")]
    CalendarExport(#[from] CalendarError),
}

impl From<AirportLookupError> for TripError {
    fn from(err: AirportLookupError) -> Self {
        TripError::Resolution(err.to_string())
    }
}

/// Returns true for a three letter, upper-case IATA airport code.
pub fn is_iata_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())
}

/// Airport identified by a display name and its IATA code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Airport {
    pub short_name: String,
    pub iata_code: String,
}

impl Airport {
    pub fn new(short_name: impl Into<String>, iata_code: &str) -> Self {
        Self {
            short_name: short_name.into().trim().to_string(),
            iata_code: iata_code.trim().to_uppercase(),
        }
    }

    /// Re-applies the trimming and upper-casing done by [`Airport::new`].
    pub fn normalized(self) -> Self {
        Self::new(self.short_name, &self.iata_code)
    }

    pub fn has_iata_code(&self) -> bool {
        is_iata_code(&self.iata_code)
    }
}

/// Normalized arrival/return cities and dates for one trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDates {
    pub arrival_city: Airport,
    pub arrival_date: String,
    pub return_city: Airport,
    pub return_date: String,
}

impl TripDates {
    pub fn normalized(self) -> Self {
        Self {
            arrival_city: self.arrival_city.normalized(),
            arrival_date: self.arrival_date.trim().to_string(),
            return_city: self.return_city.normalized(),
            return_date: self.return_date.trim().to_string(),
        }
    }
}

/// One scheduled activity inside a day slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub activity: String,
    pub location: String,
    pub duration_in_hours: f64,
}

/// The three daily periods of an itinerary day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DaySlot {
    Morning,
    Afternoon,
    Evening,
}

impl DaySlot {
    /// Slots in the order they occur during a day
    pub const ALL: [DaySlot; 3] = [DaySlot::Morning, DaySlot::Afternoon, DaySlot::Evening];

    pub fn as_str(&self) -> &'static str {
        match self {
            DaySlot::Morning => "morning",
            DaySlot::Afternoon => "afternoon",
            DaySlot::Evening => "evening",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DaySlot::Morning => "Morning",
            DaySlot::Afternoon => "Afternoon",
            DaySlot::Evening => "Evening",
        }
    }
}

/// A single day of the itinerary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryDay {
    pub day_date: String,
    pub day_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub morning: Option<Vec<Activity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub afternoon: Option<Vec<Activity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evening: Option<Vec<Activity>>,
}

impl ItineraryDay {
    /// Activities of one slot; an absent slot reads as empty.
    pub fn slot(&self, slot: DaySlot) -> &[Activity] {
        let activities = match slot {
            DaySlot::Morning => &self.morning,
            DaySlot::Afternoon => &self.afternoon,
            DaySlot::Evening => &self.evening,
        };
        activities.as_deref().unwrap_or_default()
    }
}

/// Check the day-level invariants shared by generated and exported itineraries.
///
/// Days must be numbered `1..=N` in order and every activity needs a name, a
/// location and at least one hour. Dates are left to the caller.
pub fn validate_day_structure(days: &[ItineraryDay]) -> Result<(), String> {
    for (index, day) in days.iter().enumerate() {
        let expected = index as u32 + 1;
        if day.day_number != expected {
            return Err(format!("day {} is numbered {}", expected, day.day_number));
        }

        for slot in DaySlot::ALL {
            for activity in day.slot(slot) {
                if activity.activity.trim().is_empty() || activity.location.trim().is_empty() {
                    return Err(format!("day {} {} has an activity without name or location", expected, slot.as_str()));
                }
                if activity.duration_in_hours.is_nan() || activity.duration_in_hours < 1.0 {
                    return Err(format!(
                        "day {} {} activity '{}' lasts {} hours",
                        expected,
                        slot.as_str(),
                        activity.activity,
                        activity.duration_in_hours
                    ));
                }
            }
        }
    }

    Ok(())
}

/// Departure or arrival point of a flight leg, in display format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightEndpoint {
    /// `dd/mm/yyyy`
    pub date: String,
    /// `HH:MM`, 24-hour clock
    pub time: String,
    pub airport_iata: String,
}

/// Compact summary of one direction of a flight offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightLeg {
    pub price: String,
    pub duration: String,
    pub airline: String,
    pub departure: FlightEndpoint,
    pub arrival: FlightEndpoint,
}

/// Outbound and return legs; either may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbound: Option<FlightLeg>,
    #[serde(rename = "return", default, skip_serializing_if = "Option::is_none")]
    pub return_leg: Option<FlightLeg>,
}

/// Generated days plus the cities the trip arrives in and returns from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryResult {
    pub days: Vec<ItineraryDay>,
    pub arrival_city: Airport,
    pub return_city: Airport,
}

/// Traveler position used to find the departure airport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A single request field that failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Input of a plan-trip call
#[derive(Debug, Clone, PartialEq)]
pub struct TripRequest {
    pub city: String,
    pub dates: String,
    pub preferences: Option<String>,
    pub origin: Coordinates,
}

impl TripRequest {
    /// Every field-level problem with the request, empty when it is valid.
    pub fn field_errors(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.city.trim().is_empty() {
            errors.push(FieldError::new("city", "City is required"));
        }
        if self.dates.trim().is_empty() {
            errors.push(FieldError::new("dates", "Dates are required"));
        }
        if !(-90.0..=90.0).contains(&self.origin.lat) {
            errors.push(FieldError::new("lat", "Latitude must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&self.origin.lng) {
            errors.push(FieldError::new("lng", "Longitude must be between -180 and 180"));
        }
        errors
    }

    /// Preferences with surrounding whitespace removed, `None` when blank.
    pub fn preferences(&self) -> Option<&str> {
        self.preferences
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Complete result of a plan-trip call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedTrip {
    pub itinerary: ItineraryResult,
    pub city: String,
    pub dates: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<String>,
    pub departure_airport: Airport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flights: Option<FlightBundle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(city: &str, dates: &str, lat: f64, lng: f64) -> TripRequest {
        TripRequest {
            city: city.to_string(),
            dates: dates.to_string(),
            preferences: None,
            origin: Coordinates { lat, lng },
        }
    }

    #[test]
    fn test_airport_normalization() {
        let airport = Airport::new(" Paris ", " cdg ");
        assert_eq!(airport.short_name, "Paris");
        assert_eq!(airport.iata_code, "CDG");
        assert!(airport.has_iata_code());

        assert!(!Airport::new("Nowhere", "").has_iata_code());
        assert!(!Airport::new("Bad", "LOND").has_iata_code());
        assert!(!Airport::new("Bad", "L1N").has_iata_code());
    }

    #[test]
    fn test_trip_request_validation() {
        assert!(request("Paris", "next weekend", 51.5, -0.12).field_errors().is_empty());

        let errors = request("  ", "", 91.0, -181.0).field_errors();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["city", "dates", "lat", "lng"]);

        // Range bounds are inclusive
        assert!(request("Paris", "May", -90.0, 180.0).field_errors().is_empty());
    }

    #[test]
    fn test_blank_preferences_are_ignored() {
        let mut req = request("Paris", "May", 0.0, 0.0);
        req.preferences = Some("   ".to_string());
        assert_eq!(req.preferences(), None);

        req.preferences = Some(" museums ".to_string());
        assert_eq!(req.preferences(), Some("museums"));
    }

    #[test]
    fn test_missing_slots_read_as_empty() {
        let day: ItineraryDay =
            serde_json::from_str(r#"{"dayDate":"2024-12-15","dayNumber":1,"morning":[]}"#).unwrap();
        assert!(day.slot(DaySlot::Morning).is_empty());
        assert!(day.slot(DaySlot::Evening).is_empty());
    }

    #[test]
    fn test_day_structure() {
        let day = |number: u32, hours: f64| ItineraryDay {
            day_date: "2024-12-15".to_string(),
            day_number: number,
            morning: Some(vec![Activity {
                activity: "Louvre".to_string(),
                location: "Rue de Rivoli".to_string(),
                duration_in_hours: hours,
            }]),
            afternoon: None,
            evening: None,
        };

        assert!(validate_day_structure(&[]).is_ok());
        assert!(validate_day_structure(&[day(1, 3.0), day(2, 1.0)]).is_ok());
        assert_eq!(
            validate_day_structure(&[day(1, 3.0), day(3, 1.0)]).unwrap_err(),
            "day 2 is numbered 3"
        );
        assert!(validate_day_structure(&[day(1, -2.0)]).unwrap_err().contains("lasts -2 hours"));
        assert!(validate_day_structure(&[day(1, f64::NAN)]).is_err());
    }

    #[test]
    fn test_flight_bundle_uses_return_key() {
        let bundle: FlightBundle = serde_json::from_str(
            r#"{"return":{"price":"99.00EUR","duration":"2h","airline":"Air France",
                "departure":{"date":"20/12/2024","time":"18:00","airportIata":"CDG"},
                "arrival":{"date":"20/12/2024","time":"18:30","airportIata":"LHR"}}}"#,
        )
        .unwrap();
        assert!(bundle.outbound.is_none());
        assert_eq!(bundle.return_leg.unwrap().departure.airport_iata, "CDG");
    }
}
