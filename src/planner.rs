//! Trip planning orchestration
//!
//! Airport resolution and date normalization run concurrently. Flight search
//! waits for both, and itinerary generation waits for flight search because
//! its prompt context prefers flight data when there is any.

use crate::airports::AirportResolver;
use crate::client::FlightOfferSource;
use crate::dates;
use crate::flights::FlightSearch;
use crate::oracle::{DateNormalizationRequest, ItineraryContext, ItineraryPrompt, TripOracle};
use crate::{
    validate_day_structure, FlightBundle, ItineraryDay, ItineraryResult, PlannedTrip, TripDates, TripError, TripRequest,
};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub const ARRIVAL_DATE_PLACEHOLDER: &str = "your arrival date";
pub const RETURN_AIRPORT_PLACEHOLDER: &str = "your departure location";
pub const RETURN_DATE_PLACEHOLDER: &str = "your departure date";

/// First candidate that is present and not blank, else the placeholder.
pub fn first_present(candidates: &[Option<&str>], placeholder: &str) -> String {
    candidates
        .iter()
        .flatten()
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .unwrap_or(placeholder)
        .to_string()
}

/// Resolve the arrival/return context: flight data, then normalized trip
/// dates, then a placeholder.
pub fn resolve_context(destination: &str, trip_dates: &TripDates, flights: Option<&FlightBundle>) -> ItineraryContext {
    let outbound = flights.and_then(|f| f.outbound.as_ref());
    let inbound = flights.and_then(|f| f.return_leg.as_ref());

    ItineraryContext {
        arrival_airport: first_present(
            &[
                outbound.map(|leg| leg.arrival.airport_iata.as_str()),
                Some(trip_dates.arrival_city.short_name.as_str()),
            ],
            destination,
        ),
        arrival_time: first_present(
            &[
                outbound.map(|leg| leg.arrival.time.as_str()),
                Some(trip_dates.arrival_date.as_str()),
            ],
            ARRIVAL_DATE_PLACEHOLDER,
        ),
        return_airport: first_present(
            &[
                inbound.map(|leg| leg.departure.airport_iata.as_str()),
                Some(trip_dates.return_city.short_name.as_str()),
            ],
            RETURN_AIRPORT_PLACEHOLDER,
        ),
        return_time: first_present(
            &[
                inbound.map(|leg| leg.departure.time.as_str()),
                Some(trip_dates.return_date.as_str()),
            ],
            RETURN_DATE_PLACEHOLDER,
        ),
    }
}

/// Check the structure of generated days.
///
/// On top of [`validate_day_structure`], the list must be non-empty and every
/// day must carry a real calendar date. When both normalized trip dates parse,
/// every day must fall between them.
pub fn validate_days(days: &[ItineraryDay], trip_dates: &TripDates) -> Result<(), String> {
    if days.is_empty() {
        return Err("itinerary has no days".to_string());
    }
    validate_day_structure(days)?;

    let span = match (
        dates::parse_calendar_date(&trip_dates.arrival_date),
        dates::parse_calendar_date(&trip_dates.return_date),
    ) {
        (Some(start), Some(end)) if start <= end => Some((start, end)),
        _ => None,
    };

    for day in days {
        let date = dates::parse_day_date(&day.day_date)
            .ok_or_else(|| format!("day {} has invalid date '{}'", day.day_number, day.day_date))?;
        if let Some((start, end)) = span {
            if date < start || date > end {
                return Err(format!("day {} date {} is outside {} to {}", day.day_number, date, start, end));
            }
        }
    }

    Ok(())
}

/// Orchestrates one plan-trip request across the external collaborators
#[derive(Clone)]
pub struct TripPlanner {
    oracle: Arc<dyn TripOracle>,
    airports: Arc<dyn AirportResolver>,
    flights: FlightSearch,
}

impl TripPlanner {
    pub fn new(
        oracle: Arc<dyn TripOracle>,
        airports: Arc<dyn AirportResolver>,
        offers: Arc<dyn FlightOfferSource>,
    ) -> Self {
        Self {
            oracle,
            airports,
            flights: FlightSearch::new(offers),
        }
    }

    pub async fn plan_trip(&self, request: &TripRequest) -> Result<PlannedTrip, TripError> {
        self.plan_trip_on(request, Utc::now().date_naive()).await
    }

    /// Plan a trip with an explicit "today" for relative date expressions.
    #[instrument(level = "info", skip(self, request), fields(city = %request.city, dates = %request.dates))]
    pub async fn plan_trip_on(&self, request: &TripRequest, today: NaiveDate) -> Result<PlannedTrip, TripError> {
        let field_errors = request.field_errors();
        if !field_errors.is_empty() {
            let message = field_errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            warn!(%message, "Rejecting invalid plan-trip request");
            return Err(TripError::Validation(message));
        }

        let destination = request.city.trim();
        let date_range = request.dates.trim();
        let normalization = DateNormalizationRequest {
            destination: destination.to_string(),
            date_range: date_range.to_string(),
            today,
        };

        info!("Resolving departure airport and trip dates");
        let (trip_dates, departure_airport) = tokio::join!(
            self.oracle.normalize_trip_dates(&normalization),
            self.airports.nearest_airport(request.origin),
        );

        let departure_airport = departure_airport.map_err(|e| {
            error!(error = %e, "Departure airport resolution failed");
            TripError::from(e)
        })?;
        if !departure_airport.has_iata_code() {
            error!(name = %departure_airport.short_name, "Departure airport has no IATA code");
            return Err(TripError::Resolution(format!(
                "no IATA code for departure airport '{}'",
                departure_airport.short_name
            )));
        }
        let departure_airport = departure_airport.normalized();

        let trip_dates = trip_dates
            .map_err(|e| {
                error!(error = %e, "Trip date normalization failed");
                TripError::Resolution(format!("trip date normalization failed: {}", e))
            })?
            .normalized();
        debug!(?trip_dates, departure = %departure_airport.iata_code, "Resolved trip context");

        let flights = if trip_dates.arrival_city.has_iata_code() {
            self.flights
                .search_flights(
                    &departure_airport.iata_code,
                    &trip_dates.arrival_city.iata_code,
                    &trip_dates.arrival_date,
                    &trip_dates.return_date,
                )
                .await
        } else {
            warn!(city = %trip_dates.arrival_city.short_name, "No arrival IATA code, skipping flight search");
            None
        };

        let prompt = ItineraryPrompt {
            destination: destination.to_string(),
            date_range: date_range.to_string(),
            preferences: request.preferences().map(str::to_string),
            today,
            context: resolve_context(destination, &trip_dates, flights.as_ref()),
        };
        debug!(context = ?prompt.context, "Generating itinerary");

        let days = self.oracle.generate_itinerary(&prompt).await.map_err(|e| {
            error!(error = %e, "Itinerary generation failed");
            TripError::Generation(e.to_string())
        })?;
        validate_days(&days, &trip_dates).map_err(|reason| {
            error!(%reason, "Generated itinerary is invalid");
            TripError::Generation(reason)
        })?;

        info!(days = days.len(), has_flights = flights.is_some(), "Trip planned");
        Ok(PlannedTrip {
            itinerary: ItineraryResult {
                days,
                arrival_city: trip_dates.arrival_city,
                return_city: trip_dates.return_city,
            },
            city: destination.to_string(),
            dates: date_range.to_string(),
            preferences: prompt.preferences,
            departure_airport,
            flights,
        })
    }
}
