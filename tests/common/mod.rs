//! Deterministic stand-ins for the external collaborators

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;
use trip_planner::airports::AirportLookupError;
use trip_planner::client::{FlightOffersResponse, OfferQuery};
use trip_planner::oracle::{DateNormalizationRequest, ItineraryPrompt};
use trip_planner::{
    Activity, Airport, AirportResolver, Coordinates, FlightOfferSource, FlightSearchError, ItineraryDay,
    OracleError, TripDates, TripOracle, TripPlanner, TripRequest,
};

pub const ROUND_TRIP_OFFERS: &str = r#"{
    "data": [
        {
            "itineraries": [
                {"duration": "PT1H20M", "segments": [
                    {"departure": {"iataCode": "LHR", "at": "2024-12-15T08:00:00"},
                     "arrival": {"iataCode": "CDG", "at": "2024-12-15T10:20:00"}, "carrierCode": "AF"}]},
                {"duration": "PT1H15M", "segments": [
                    {"departure": {"iataCode": "ORY", "at": "2024-12-17T18:45:00"},
                     "arrival": {"iataCode": "LHR", "at": "2024-12-17T19:00:00"}, "carrierCode": "AF"}]}
            ],
            "price": {"total": "182.40", "currency": "EUR"}
        },
        {
            "itineraries": [
                {"duration": "PT1H10M", "segments": [
                    {"departure": {"iataCode": "LGW", "at": "2024-12-15T06:00:00"},
                     "arrival": {"iataCode": "CDG", "at": "2024-12-15T08:10:00"}, "carrierCode": "U2"}]}
            ],
            "price": {"total": "49.99", "currency": "EUR"}
        }
    ],
    "dictionaries": {"carriers": {"AF": "AIR FRANCE", "U2": "EASYJET"}}
}"#;

pub fn offers(body: &str) -> FlightOffersResponse {
    serde_json::from_str(body).expect("valid offers fixture")
}

pub fn paris_dates() -> TripDates {
    TripDates {
        arrival_city: Airport::new("Paris", "cdg"),
        arrival_date: "December 15, 2024".to_string(),
        return_city: Airport::new("Paris", "CDG"),
        return_date: "17/12/2024".to_string(),
    }
}

pub fn activity(name: &str, location: &str, hours: f64) -> Activity {
    Activity {
        activity: name.to_string(),
        location: location.to_string(),
        duration_in_hours: hours,
    }
}

pub fn paris_days() -> Vec<ItineraryDay> {
    vec![
        ItineraryDay {
            day_date: "2024-12-15".to_string(),
            day_number: 1,
            morning: Some(vec![]),
            afternoon: Some(vec![activity("Louvre", "Rue de Rivoli", 3.0)]),
            evening: Some(vec![activity("Seine cruise", "Pont Neuf", 2.0)]),
        },
        ItineraryDay {
            day_date: "2024-12-16".to_string(),
            day_number: 2,
            morning: Some(vec![activity("Musée d'Orsay", "Rue de la Légion d'Honneur", 3.0)]),
            afternoon: None,
            evening: None,
        },
        ItineraryDay {
            day_date: "2024-12-17".to_string(),
            day_number: 3,
            morning: Some(vec![activity("Montmartre", "Sacré-Cœur", 2.0)]),
            afternoon: None,
            evening: None,
        },
    ]
}

pub fn trip_request() -> TripRequest {
    TripRequest {
        city: "Paris".to_string(),
        dates: "mid December".to_string(),
        preferences: Some("art museums".to_string()),
        origin: Coordinates { lat: 51.47, lng: -0.45 },
    }
}

pub struct FakeOracle {
    pub trip_dates: Result<TripDates, String>,
    pub days: Result<Vec<ItineraryDay>, String>,
    pub barrier: Option<Arc<Barrier>>,
    pub normalize_calls: AtomicUsize,
    pub prompts: Mutex<Vec<ItineraryPrompt>>,
}

impl FakeOracle {
    pub fn new(trip_dates: TripDates, days: Vec<ItineraryDay>) -> Self {
        Self {
            trip_dates: Ok(trip_dates),
            days: Ok(days),
            barrier: None,
            normalize_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<ItineraryPrompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TripOracle for FakeOracle {
    async fn normalize_trip_dates(&self, _request: &DateNormalizationRequest) -> Result<TripDates, OracleError> {
        self.normalize_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        self.trip_dates.clone().map_err(OracleError::Refused)
    }

    async fn generate_itinerary(&self, prompt: &ItineraryPrompt) -> Result<Vec<ItineraryDay>, OracleError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.days.clone().map_err(|_| OracleError::EmptyResponse)
    }
}

pub struct FakeAirports {
    pub airport: Option<Airport>,
    pub barrier: Option<Arc<Barrier>>,
    pub calls: AtomicUsize,
}

impl FakeAirports {
    pub fn new(airport: Option<Airport>) -> Self {
        Self {
            airport,
            barrier: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AirportResolver for FakeAirports {
    async fn nearest_airport(&self, origin: Coordinates) -> Result<Airport, AirportLookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        self.airport.clone().ok_or(AirportLookupError::NoAirportFound {
            lat: origin.lat,
            lng: origin.lng,
        })
    }
}

pub struct FakeOffers {
    /// `None` makes every search fail with an API error
    pub response: Option<FlightOffersResponse>,
    pub queries: Mutex<Vec<OfferQuery>>,
}

impl FakeOffers {
    pub fn new(response: Option<FlightOffersResponse>) -> Self {
        Self {
            response,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<OfferQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl FlightOfferSource for FakeOffers {
    async fn search_offers(&self, query: &OfferQuery) -> Result<FlightOffersResponse, FlightSearchError> {
        self.queries.lock().unwrap().push(query.clone());
        self.response.clone().ok_or(FlightSearchError::ApiError {
            status: 500,
            message: "upstream unavailable".to_string(),
        })
    }
}

pub fn planner(oracle: &Arc<FakeOracle>, airports: &Arc<FakeAirports>, offers: &Arc<FakeOffers>) -> TripPlanner {
    TripPlanner::new(oracle.clone(), airports.clone(), offers.clone())
}
